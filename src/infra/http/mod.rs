pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};

use axum::{Router, http::StatusCode, middleware as axum_middleware, routing::get};

use middleware::{log_responses, set_request_context};

/// Full HTTP surface: health check plus the JSON API, with request logging.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(build_api_router(state))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
