//! Reseller passthrough handlers

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::Value;
use tracing::info;

use crate::application::reseller::{
    ApiMode, CredentialOverrides, PRICE_LIST_ALL, TransactionRequest, non_blank,
};

use super::{domain_to_api, upstream_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{
    ConnectionTestRequest, ConnectionTestResponse, MessageResponse, PriceListQueryRequest,
    PriceListQueryResponse, TransactionPayload, TransactionResponse,
};
use crate::infra::http::api::state::ApiState;

pub async fn test_connection(
    State(state): State<ApiState>,
    Json(payload): Json<ConnectionTestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let overrides = CredentialOverrides {
        username: non_blank(payload.username),
        development_key: non_blank(payload.dev_key),
        production_key: None,
    };

    let balance = state
        .reseller
        .balance(ApiMode::Development, &overrides)
        .await
        .map_err(upstream_to_api)?;

    Ok(Json(ConnectionTestResponse {
        message: "reseller connection succeeded".to_string(),
        balance: balance.deposit,
    }))
}

pub async fn query_price_list(
    State(state): State<ApiState>,
    Json(payload): Json<PriceListQueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = non_blank(payload.kind).unwrap_or_else(|| PRICE_LIST_ALL.to_string());
    let mut products = state
        .reseller
        .price_list(&command)
        .await
        .map_err(upstream_to_api)?;

    if let Some(brand) = non_blank(payload.brand) {
        products.retain(|entry| entry.brand == brand);
    }

    Ok(Json(PriceListQueryResponse { products }))
}

pub async fn submit_transaction(
    State(state): State<ApiState>,
    Json(payload): Json<TransactionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let request =
        TransactionRequest::new(payload.buyer_sku_code, payload.customer_no, payload.ref_id)
            .map_err(domain_to_api)?;
    let mode = ApiMode::from_production_flag(payload.production);

    let transaction = state
        .reseller
        .submit_transaction(&request, mode)
        .await
        .map_err(upstream_to_api)?;

    info!(
        target = "storefront::reseller",
        ref_id = %request.ref_id,
        sku = %request.buyer_sku_code,
        mode = mode.as_str(),
        "transaction submitted"
    );

    Ok(Json(TransactionResponse {
        message: "transaction processed".to_string(),
        transaction,
    }))
}

/// Acknowledges reseller callbacks. The body is logged, not verified.
pub async fn reseller_webhook(Json(payload): Json<Value>) -> impl IntoResponse {
    let ref_id = payload.get("ref_id").and_then(Value::as_str).unwrap_or("");
    info!(
        target = "storefront::reseller::webhook",
        ref_id,
        body = %payload,
        "reseller callback received"
    );
    Json(MessageResponse::new("Callback received"))
}
