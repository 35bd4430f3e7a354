use anyhow::{anyhow, Result};
use url::Url;

use crate::domain::post::Post;
use crate::infra::mail::{Mailer, OutgoingMail};

/// A reader's request to email a post to someone else.
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub name: String,
    pub email: String,
    pub to: String,
    pub comment: String,
}

#[derive(Clone)]
pub struct NotificationService {
    mailer: Mailer,
}

impl NotificationService {
    pub fn new(mailer: Mailer) -> Self {
        Self { mailer }
    }

    /// Sends the recommendation once; transport failures are returned as is.
    pub async fn recommend_post(
        &self,
        recommendation: &Recommendation,
        post: &Post,
        site_url: &Url,
    ) -> Result<OutgoingMail> {
        let post_url = post_url(site_url, post)?;
        let mail = compose_recommendation(recommendation, post, &post_url);
        self.mailer.send(&mail).await?;
        tracing::info!(post_id = post.id, to = %recommendation.to, "post recommendation sent");
        Ok(mail)
    }
}

/// Absolute detail URL under `site_url`, keeping any path prefix it carries.
pub fn post_url(site_url: &Url, post: &Post) -> Result<Url> {
    let mut base = site_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(post.absolute_path().trim_start_matches('/'))
        .map_err(|err| anyhow!("invalid post url for post {}: {}", post.id, err))
}

pub fn compose_recommendation(
    recommendation: &Recommendation,
    post: &Post,
    post_url: &Url,
) -> OutgoingMail {
    let subject = format!("{} recommends you read {}", recommendation.name, post.title);
    let body = format!(
        "Read {} at {}\n\n{}'s comments: {}",
        post.title, post_url, recommendation.name, recommendation.comment
    );

    OutgoingMail {
        subject,
        body,
        from: recommendation.email.clone(),
        to: vec![recommendation.to.clone()],
    }
}
