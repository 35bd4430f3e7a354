//! Share Tests
//!
//! Covers the email recommendation form and message composition.

mod common;

use axum::http::StatusCode;
use common::{app, app_with_failing_mail};
use quill::app::notifications::{compose_recommendation, post_url, Recommendation};
use quill::domain::post::{Post, PostStatus};
use serde_json::json;
use time::OffsetDateTime;
use url::Url;

fn sample_post() -> Post {
    Post {
        id: 3,
        title: "Hello World".to_string(),
        content: "body".to_string(),
        slug: "hello-world".to_string(),
        author_id: 1,
        author_username: Some("alice".to_string()),
        status: PostStatus::Published,
        created_at: OffsetDateTime::now_utc(),
    }
}

#[tokio::test]
async fn share_form_shows_post_unsent() {
    let app = app().await;
    let alice = app.create_user("alice").await;
    let post = app.create_post(&alice, "Hello World").await;

    let resp = app.get(&format!("/{}/post_share/", post.id), None).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["sent"], false);
    assert_eq!(body["post"]["title"], "Hello World");
}

#[tokio::test]
async fn share_sends_one_recommendation() {
    let app = app().await;
    let alice = app.create_user("alice").await;
    let post = app.create_post(&alice, "Hello World").await;

    let resp = app
        .post_json(
            &format!("/{}/post_share/", post.id),
            json!({
                "name": "Alice",
                "email": "alice@example.com",
                "to": "bob@example.com",
                "comment": "Worth it"
            }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["sent"], true);

    let sent = app.mail.sent();
    assert_eq!(sent.len(), 1);
    let mail = &sent[0];
    assert_eq!(mail.subject, "Alice recommends you read Hello World");
    assert_eq!(
        mail.body,
        format!(
            "Read Hello World at http://localhost:8080/{}/hello-world/\n\nAlice's comments: Worth it",
            post.id
        )
    );
    assert_eq!(mail.from, "alice@example.com");
    assert_eq!(mail.to, vec!["bob@example.com".to_string()]);
}

#[tokio::test]
async fn share_rejects_invalid_addresses() {
    let app = app().await;
    let alice = app.create_user("alice").await;
    let post = app.create_post(&alice, "Hello World").await;

    let resp = app
        .post_json(
            &format!("/{}/post_share/", post.id),
            json!({ "name": "Alice", "email": "not-an-email", "to": "" }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    let fields = &resp.json()["fields"];
    assert_eq!(fields["email"], json!(["Enter a valid email address."]));
    assert_eq!(fields["to"], json!(["This field is required."]));
    assert!(fields.get("name").is_none());
    assert!(fields.get("comment").is_none());
    assert!(app.mail.sent().is_empty());
}

#[tokio::test]
async fn share_missing_post_is_not_found() {
    let app = app().await;

    let resp = app
        .post_json(
            "/5/post_share/",
            json!({ "name": "Alice", "email": "alice@example.com", "to": "bob@example.com" }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert!(app.mail.sent().is_empty());

    let resp = app.get("/5/post_share/", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transport_failure_is_a_delivery_error() {
    let app = app_with_failing_mail().await;
    let alice = app.create_user("alice").await;
    let post = app.create_post(&alice, "Hello World").await;

    let resp = app
        .post_json(
            &format!("/{}/post_share/", post.id),
            json!({ "name": "Alice", "email": "alice@example.com", "to": "bob@example.com" }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_GATEWAY);
    assert_eq!(resp.error_message(), "failed to send email");
}

#[test]
fn post_url_joins_site_and_detail_path() {
    let site = Url::parse("https://blog.example.com").unwrap();

    let url = post_url(&site, &sample_post()).unwrap();

    assert_eq!(url.as_str(), "https://blog.example.com/3/hello-world/");
}

#[test]
fn post_url_keeps_site_path_prefix() {
    let post = sample_post();

    for site in ["https://example.com/blog/", "https://example.com/blog"] {
        let url = post_url(&Url::parse(site).unwrap(), &post).unwrap();

        assert_eq!(url.as_str(), "https://example.com/blog/3/hello-world/");
    }
}

#[test]
fn recommendation_without_comment_keeps_the_line() {
    let post = sample_post();
    let recommendation = Recommendation {
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        to: "bob@example.com".to_string(),
        comment: String::new(),
    };
    let url = Url::parse("http://localhost:8080/3/hello-world/").unwrap();

    let mail = compose_recommendation(&recommendation, &post, &url);

    assert_eq!(mail.subject, "Alice recommends you read Hello World");
    assert_eq!(
        mail.body,
        "Read Hello World at http://localhost:8080/3/hello-world/\n\nAlice's comments: "
    );
}
