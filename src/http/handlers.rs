use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::app::auth::AuthService;
use crate::app::comments::CommentService;
use crate::app::notifications::NotificationService;
use crate::app::ownership::is_owner;
use crate::app::pagination::Page;
use crate::app::posts::PostService;
use crate::app::users::UserService;
use crate::domain::comment::Comment;
use crate::domain::post::{Post, PostStatus};
use crate::domain::user::{PublicUser, User};
use crate::http::forms::{
    validate_form, CommentForm, EmailPostForm, FormBody, PostForm, RegisterForm,
};
use crate::http::{AppError, AuthUser};
use crate::infra::db::is_unique_violation;
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

#[derive(Serialize)]
pub struct AboutResponse {
    pub title: &'static str,
    pub description: &'static str,
}

pub async fn about() -> Json<AboutResponse> {
    Json(AboutResponse {
        title: "About",
        description: "A small blog: read posts, leave comments, and share what you like.",
    })
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Post>>, AppError> {
    let page = query.page.unwrap_or(1);
    let service = PostService::new(state.db.clone());
    let posts = service
        .list_all(page, state.posts_per_page)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, page, "failed to list posts");
            AppError::internal("failed to list posts")
        })?;

    posts
        .map(Json)
        .ok_or_else(|| AppError::not_found("page not found"))
}

#[derive(Serialize)]
pub struct UserPostsResponse {
    pub author: PublicUser,
    #[serde(flatten)]
    pub posts: Page<Post>,
}

pub async fn list_user_posts(
    Path(username): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserPostsResponse>, AppError> {
    let page = query.page.unwrap_or(1);

    let users = UserService::new(state.db.clone());
    let author = users
        .get_by_username(&username)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, username = %username, "failed to fetch user");
            AppError::internal("failed to fetch user")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    let service = PostService::new(state.db.clone());
    let posts = service
        .list_by_author(author.id, page, state.posts_per_page)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, author_id = author.id, page, "failed to list user posts");
            AppError::internal("failed to list user posts")
        })?
        .ok_or_else(|| AppError::not_found("page not found"))?;

    Ok(Json(UserPostsResponse {
        author: author.into(),
        posts,
    }))
}

// ---------------------------------------------------------------------------
// Detail and comments
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct PostDetailResponse {
    pub post: Post,
    pub comments: Vec<Comment>,
}

pub async fn post_detail(
    Path((id, slug)): Path<(i64, String)>,
    State(state): State<AppState>,
) -> Result<Json<PostDetailResponse>, AppError> {
    let post = fetch_post_by_id_and_slug(&state, id, &slug).await?;

    let comments = CommentService::new(state.db.clone())
        .list_active_for_post(post.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = post.id, "failed to list comments");
            AppError::internal("failed to list comments")
        })?;

    Ok(Json(PostDetailResponse { post, comments }))
}

pub async fn post_comment(
    Path(post_id): Path<i64>,
    auth: AuthUser,
    State(state): State<AppState>,
    FormBody(form): FormBody<CommentForm>,
) -> Result<Json<Comment>, AppError> {
    let post = fetch_post(&state, post_id).await?;
    let form = validate_form(form)?;

    let service = CommentService::new(state.db.clone());
    let comment = service
        .create(post.id, auth.user_id, form.body.unwrap_or_default())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = auth.user_id, post_id, "failed to comment");
            AppError::internal("failed to comment")
        })?;

    Ok(Json(comment))
}

// ---------------------------------------------------------------------------
// Share by email
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ShareResponse {
    pub post: Post,
    pub sent: bool,
}

pub async fn share_form(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ShareResponse>, AppError> {
    let post = fetch_post(&state, id).await?;
    Ok(Json(ShareResponse { post, sent: false }))
}

pub async fn share_post(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    FormBody(form): FormBody<EmailPostForm>,
) -> Result<Json<ShareResponse>, AppError> {
    let post = fetch_post(&state, id).await?;
    let recommendation = validate_form(form)?.into_recommendation();

    let service = NotificationService::new(state.mailer.clone());
    service
        .recommend_post(&recommendation, &post, &state.site_url)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = id, "failed to send recommendation");
            AppError::delivery("failed to send email")
        })?;

    Ok(Json(ShareResponse { post, sent: true }))
}

// ---------------------------------------------------------------------------
// Authoring
// ---------------------------------------------------------------------------

/// Current (or initial) values of the post form.
#[derive(Serialize)]
pub struct PostFormResponse {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
}

pub async fn new_post_form(_auth: AuthUser) -> Json<PostFormResponse> {
    Json(PostFormResponse {
        title: String::new(),
        content: String::new(),
        status: PostStatus::default(),
    })
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    FormBody(form): FormBody<PostForm>,
) -> Result<Json<Post>, AppError> {
    let new_post = validate_form(form)?.into_new_post();

    let service = PostService::new(state.db.clone());
    let post = service
        .create(auth.user_id, new_post)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, author_id = auth.user_id, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    Ok(Json(post))
}

pub async fn edit_post_form(
    Path(id): Path<i64>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<PostFormResponse>, AppError> {
    let post = fetch_owned_post(&state, id, &auth).await?;

    Ok(Json(PostFormResponse {
        title: post.title,
        content: post.content,
        status: post.status,
    }))
}

pub async fn update_post(
    Path(id): Path<i64>,
    auth: AuthUser,
    State(state): State<AppState>,
    FormBody(form): FormBody<PostForm>,
) -> Result<Json<Post>, AppError> {
    fetch_owned_post(&state, id, &auth).await?;
    let changes = validate_form(form)?.into_changes();

    let service = PostService::new(state.db.clone());
    let post = service.update(id, changes).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = id, "failed to update post");
        AppError::internal("failed to update post")
    })?;

    post.map(Json)
        .ok_or_else(|| AppError::not_found("post not found"))
}

pub async fn delete_post(
    Path(id): Path<i64>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    fetch_owned_post(&state, id, &auth).await?;

    let service = PostService::new(state.db.clone());
    let deleted = service.delete(id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = id, "failed to delete post");
        AppError::internal("failed to delete post")
    })?;

    if deleted {
        tracing::info!(post_id = id, user_id = auth.user_id, "post deleted");
        Ok(Redirect::to("/"))
    } else {
        Err(AppError::not_found("post not found"))
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub async fn register(
    State(state): State<AppState>,
    FormBody(form): FormBody<RegisterForm>,
) -> Result<Json<User>, AppError> {
    let form = validate_form(form)?;

    let service = AuthService::new(
        state.db.clone(),
        state.paseto_access_key,
        state.access_ttl_minutes,
    );
    let user = service
        .register(
            form.username.unwrap_or_default(),
            form.email.unwrap_or_default(),
            form.password.unwrap_or_default(),
        )
        .await
        .map_err(|err| {
            if let Some(sqlx_err) = err.downcast_ref::<sqlx::Error>() {
                if is_unique_violation(sqlx_err) {
                    return AppError::conflict("username already taken");
                }
            }
            tracing::error!(error = ?err, "failed to register user");
            AppError::internal("failed to register user")
        })?;

    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    const MAX_PASSWORD_LEN: usize = 128;

    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("username and password are required"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let service = AuthService::new(
        state.db.clone(),
        state.paseto_access_key,
        state.access_ttl_minutes,
    );
    let token = service
        .login(payload.username.trim(), &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match token {
        Some(token) => Ok(Json(AccessTokenResponse {
            access_token: token.token,
            expires_at: token.expires_at,
        })),
        None => Err(AppError::unauthorized("invalid credentials")),
    }
}

pub async fn get_current_user(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let service = UserService::new(state.db.clone());
    let user = service.get_user(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = auth.user_id, "failed to fetch current user");
        AppError::internal("failed to fetch current user")
    })?;

    user.map(Json)
        .ok_or_else(|| AppError::not_found("user not found"))
}

// ---------------------------------------------------------------------------
// Lookups shared by the handlers above
// ---------------------------------------------------------------------------

async fn fetch_post(state: &AppState, id: i64) -> Result<Post, AppError> {
    PostService::new(state.db.clone())
        .get(id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = id, "failed to fetch post");
            AppError::internal("failed to fetch post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))
}

async fn fetch_post_by_id_and_slug(
    state: &AppState,
    id: i64,
    slug: &str,
) -> Result<Post, AppError> {
    PostService::new(state.db.clone())
        .get_by_id_and_slug(id, slug)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = id, slug = %slug, "failed to fetch post");
            AppError::internal("failed to fetch post")
        })?
        .ok_or_else(|| AppError::not_found("post not found"))
}

/// Fetch then authorize: 404 when the post is missing, 403 when `auth` is not its author.
async fn fetch_owned_post(state: &AppState, id: i64, auth: &AuthUser) -> Result<Post, AppError> {
    let post = fetch_post(state, id).await?;
    if !is_owner(&post, auth.user_id) {
        tracing::warn!(post_id = id, user_id = auth.user_id, "rejected non-author mutation");
        return Err(AppError::forbidden("forbidden"));
    }
    Ok(post)
}
