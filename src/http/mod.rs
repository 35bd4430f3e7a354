use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

mod auth;
mod error;
pub mod forms;
mod handlers;
mod routes;

pub use error::{AppError, FieldErrors};
pub use auth::AuthUser;

pub fn router(state: AppState) -> Router {
    let body_limit = state.request_body_limit_bytes;

    Router::new()
        .merge(routes::health())
        .merge(routes::accounts())
        .merge(routes::blog())
        .merge(routes::posts())
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
