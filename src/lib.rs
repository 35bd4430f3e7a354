pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use url::Url;

use crate::config::AppConfig;
use crate::infra::{db::Db, mail::Mailer};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub mailer: Mailer,
    pub paseto_access_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub site_url: Url,
    pub posts_per_page: i64,
    pub request_body_limit_bytes: usize,
}

impl AppState {
    pub fn new(config: &AppConfig, db: Db, mailer: Mailer) -> Self {
        Self {
            db,
            mailer,
            paseto_access_key: config.paseto_access_key,
            access_ttl_minutes: config.access_ttl_minutes,
            site_url: config.site_url.clone(),
            posts_per_page: config.posts_per_page,
            request_body_limit_bytes: config.request_body_limit_bytes,
        }
    }
}
