#![allow(dead_code)]

use anyhow::anyhow;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use url::Url;

use quill::app::auth::AuthService;
use quill::config::{AppConfig, SmtpConfig};
use quill::infra::db::{sortable_timestamp, Db};
use quill::infra::mail::{MailTransport, Mailer, OutgoingMail};
use quill::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

// test-only key, never used outside this harness
const TEST_PASETO_ACCESS_KEY: [u8; 32] = *b"0123456789abcdef0123456789abcdef";
pub const SITE_URL: &str = "http://localhost:8080";
pub const DEFAULT_PASSWORD: &str = "testpassword123";

// ---------------------------------------------------------------------------
// Mail transports
// ---------------------------------------------------------------------------

/// Keeps every message it is handed.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<OutgoingMail>>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().expect("mail log poisoned").clone()
    }
}

#[axum::async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        self.sent.lock().expect("mail log poisoned").push(mail.clone());
        Ok(())
    }
}

/// Refuses every message, like an unreachable relay.
pub struct FailingTransport;

#[axum::async_trait]
impl MailTransport for FailingTransport {
    async fn send(&self, _mail: &OutgoingMail) -> anyhow::Result<()> {
        Err(anyhow!("connection refused"))
    }
}

// ---------------------------------------------------------------------------
// TestApp: one in-memory database per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub mail: RecordingTransport,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub access_token: String,
}

pub struct TestPost {
    pub id: i64,
    pub slug: String,
}

pub async fn app() -> TestApp {
    let mail = RecordingTransport::default();
    TestApp::setup(Arc::new(mail.clone()), mail).await
}

/// An app whose mail relay rejects everything.
pub async fn app_with_failing_mail() -> TestApp {
    TestApp::setup(Arc::new(FailingTransport), RecordingTransport::default()).await
}

pub fn test_config() -> AppConfig {
    AppConfig {
        http_addr: "127.0.0.1:0".to_string(),
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        db_connect_timeout_seconds: 5,
        db_idle_timeout_seconds: 300,
        db_max_lifetime_seconds: 1800,
        paseto_access_key: TEST_PASETO_ACCESS_KEY,
        access_ttl_minutes: 60,
        site_url: Url::parse(SITE_URL).expect("valid site url"),
        posts_per_page: 5,
        smtp: SmtpConfig {
            host: String::new(),
            port: 587,
            username: None,
            password: None,
            starttls: true,
        },
        request_body_limit_bytes: 1024 * 1024,
    }
}

impl TestApp {
    async fn setup(transport: Arc<dyn MailTransport>, mail: RecordingTransport) -> Self {
        let config = test_config();
        let db = Db::connect(&config).await.expect("Db::connect failed");
        let state = AppState::new(&config, db, Mailer::new(transport));
        let router = quill::http::router(state.clone());

        TestApp {
            router,
            state,
            mail,
        }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = if let Some(body) = body {
            builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            location,
            body_bytes,
        }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, None, token).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, Some(body), token).await
    }

    pub async fn post_empty(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, None, token).await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Insert a user directly and issue an access token for it.
    pub async fn create_user(&self, username: &str) -> TestUser {
        let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
        let hash = Argon2::default()
            .hash_password(DEFAULT_PASSWORD.as_bytes(), &salt)
            .expect("password hash failed")
            .to_string();

        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, email, password_hash, created_at) \
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(username)
        .bind(format!("{}@example.com", username))
        .bind(&hash)
        .bind(sortable_timestamp(time::OffsetDateTime::now_utc()).unwrap())
        .fetch_one(self.pool())
        .await
        .expect("insert test user failed");

        let auth_service = AuthService::new(
            self.state.db.clone(),
            self.state.paseto_access_key,
            self.state.access_ttl_minutes,
        );
        let token = auth_service
            .issue_access_token(user_id)
            .expect("issue_access_token failed");

        TestUser {
            id: user_id,
            username: username.to_string(),
            access_token: token.token,
        }
    }

    /// Create a post through the API as `author`.
    pub async fn create_post(&self, author: &TestUser, title: &str) -> TestPost {
        let resp = self
            .post_json(
                "/post/new/",
                json!({ "title": title, "content": format!("{} body", title) }),
                Some(&author.access_token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "create post failed: {:?}", resp.json());

        let body = resp.json();
        TestPost {
            id: body["id"].as_i64().expect("post id"),
            slug: body["slug"].as_str().expect("post slug").to_string(),
        }
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.pool())
            .await
            .expect("count failed")
    }

    /// Return the pool for direct DB assertions.
    pub fn pool(&self) -> &SqlitePool {
        self.state.db.pool()
    }
}
