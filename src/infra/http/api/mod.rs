pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    routing::{get, post},
};

/// The static `/api/products/*` routes win over `{key}`, so records whose id
/// is `grouped`, `categories` or `sync` are not addressable by key.
pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/products", get(handlers::list_products))
        .route("/api/products/grouped", get(handlers::grouped_products))
        .route("/api/products/categories", get(handlers::list_categories))
        .route("/api/products/sync", post(handlers::sync_products))
        .route(
            "/api/products/{key}",
            get(handlers::product_detail).delete(handlers::delete_product),
        )
        .route(
            "/api/reseller/test-connection",
            post(handlers::test_connection),
        )
        .route("/api/reseller/products", post(handlers::query_price_list))
        .route(
            "/api/reseller/transaction",
            post(handlers::submit_transaction),
        )
        .route("/api/reseller/webhook", post(handlers::reseller_webhook))
        .route(
            "/api/settings/api",
            get(handlers::get_api_settings).post(handlers::update_api_settings),
        )
        .with_state(state)
}
