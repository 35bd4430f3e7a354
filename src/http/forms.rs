//! Request bodies for the submission endpoints.
//!
//! String fields are trimmed and blank values become `None` before
//! validation, so a whitespace-only field reports "This field is required."
//! and nothing else. Failures are returned as a field -> messages map.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::app::notifications::Recommendation;
use crate::domain::post::{NewPost, PostChanges, PostStatus};
use crate::http::error::FieldErrors;
use crate::http::AppError;

/// Key for errors that belong to the body as a whole rather than one field.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// JSON body whose rejections use the same error body as form validation.
pub struct FormBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for FormBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(JsonRejection::JsonDataError(err)) => {
                let mut fields = FieldErrors::new();
                fields.insert(NON_FIELD_ERRORS.to_string(), vec![err.body_text()]);
                Err(AppError::validation(fields))
            }
            Err(rejection) => Err(AppError::new(rejection.status(), rejection.body_text())),
        }
    }
}

pub trait Form: Validate {
    fn clean(&mut self);
}

/// Cleans then validates `form`, mapping failures to a 400 with field errors.
pub fn validate_form<F: Form>(mut form: F) -> Result<F, AppError> {
    form.clean();
    form.validate()
        .map_err(|errors| AppError::validation(field_errors(&errors)))?;
    Ok(form)
}

pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let messages = errors
                .iter()
                .map(|error| match &error.message {
                    Some(message) => message.to_string(),
                    None => error.code.to_string(),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

fn trimmed(value: &mut Option<String>) {
    *value = value
        .take()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PostForm {
    #[validate(
        required(message = "This field is required."),
        length(max = 100, message = "Ensure this value has at most 100 characters.")
    )]
    pub title: Option<String>,
    #[validate(required(message = "This field is required."))]
    pub content: Option<String>,
    pub status: Option<PostStatus>,
}

impl Form for PostForm {
    fn clean(&mut self) {
        trimmed(&mut self.title);
        trimmed(&mut self.content);
    }
}

impl PostForm {
    pub fn into_new_post(self) -> NewPost {
        NewPost {
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
        }
    }

    pub fn into_changes(self) -> PostChanges {
        PostChanges {
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            status: self.status,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CommentForm {
    #[validate(required(message = "This field is required."))]
    pub body: Option<String>,
}

impl Form for CommentForm {
    fn clean(&mut self) {
        trimmed(&mut self.body);
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct EmailPostForm {
    #[validate(
        required(message = "This field is required."),
        length(max = 50, message = "Ensure this value has at most 50 characters.")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "This field is required."),
        email(message = "Enter a valid email address.")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "This field is required."),
        email(message = "Enter a valid email address.")
    )]
    pub to: Option<String>,
    pub comment: Option<String>,
}

impl Form for EmailPostForm {
    fn clean(&mut self) {
        trimmed(&mut self.name);
        trimmed(&mut self.email);
        trimmed(&mut self.to);
        trimmed(&mut self.comment);
    }
}

impl EmailPostForm {
    pub fn into_recommendation(self) -> Recommendation {
        Recommendation {
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            to: self.to.unwrap_or_default(),
            comment: self.comment.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterForm {
    #[validate(
        required(message = "This field is required."),
        length(max = 150, message = "Ensure this value has at most 150 characters.")
    )]
    pub username: Option<String>,
    #[validate(
        required(message = "This field is required."),
        email(message = "Enter a valid email address.")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(
            min = 8,
            max = 128,
            message = "Password must be between 8 and 128 characters."
        )
    )]
    pub password: Option<String>,
}

impl Form for RegisterForm {
    fn clean(&mut self) {
        trimmed(&mut self.username);
        trimmed(&mut self.email);
        // passwords keep their whitespace; only an empty one counts as missing
        if self.password.as_deref() == Some("") {
            self.password = None;
        }
    }
}
