//! Product catalog handlers

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use axum::response::IntoResponse;

use super::products_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{CategoriesResponse, MessageResponse, SyncResponse};
use crate::infra::http::api::state::ApiState;

pub async fn list_products(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let envelope = state.products.products().await.map_err(products_to_api)?;
    Ok(Json(envelope.data.clone()))
}

pub async fn grouped_products(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .products
        .grouped_catalog()
        .await
        .map_err(products_to_api)?;

    Ok((
        [
            (CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (PRAGMA, "no-cache"),
            (EXPIRES, "0"),
        ],
        Json(entries),
    ))
}

pub async fn list_categories(State(state): State<ApiState>) -> impl IntoResponse {
    let categories = state.products.categories().await;
    Json(CategoriesResponse { categories })
}

pub async fn product_detail(
    State(state): State<ApiState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .products
        .product_detail(&key)
        .await
        .map_err(products_to_api)?;
    Ok(Json(detail))
}

pub async fn delete_product(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .products
        .delete_product(&id)
        .await
        .map_err(products_to_api)?;

    Ok(Json(MessageResponse::new(format!(
        "product {id} removed from cache"
    ))))
}

pub async fn sync_products(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let envelope = state.products.sync_now().await.map_err(products_to_api)?;
    let products_count = envelope.len();

    Ok(Json(SyncResponse {
        message: format!("synchronized {products_count} products from reseller"),
        products_count,
    }))
}
