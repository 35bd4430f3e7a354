use axum::{routing::get, routing::post, Router};

use crate::AppState;
use crate::http::handlers;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn accounts() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/me", get(handlers::get_current_user))
}

pub fn blog() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_posts))
        .route("/about/", get(handlers::about))
        .route("/user/:username/", get(handlers::list_user_posts))
        .route("/:id/:slug/", get(handlers::post_detail))
        .route("/:id/comment/", post(handlers::post_comment))
        .route(
            "/:id/post_share/",
            get(handlers::share_form).post(handlers::share_post),
        )
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route(
            "/post/new/",
            get(handlers::new_post_form).post(handlers::create_post),
        )
        .route(
            "/post/:id/update",
            get(handlers::edit_post_form).post(handlers::update_post),
        )
        .route("/post/:id/delete", post(handlers::delete_post))
}
