//! Runtime reseller settings handlers

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use tracing::info;

use crate::application::reseller::ResellerCredentials;
use crate::infra::http::api::models::{ApiSettingsUpdate, ApiSettingsView, MessageResponse};
use crate::infra::http::api::state::ApiState;

pub async fn get_api_settings(State(state): State<ApiState>) -> impl IntoResponse {
    let credentials = state.credentials.snapshot();
    Json(ApiSettingsView {
        username: credentials.username,
        development_key_configured: !credentials.development_key.is_empty(),
        production_key_configured: !credentials.production_key.is_empty(),
    })
}

/// Replaces the process-local credentials; absent fields are cleared.
pub async fn update_api_settings(
    State(state): State<ApiState>,
    Json(payload): Json<ApiSettingsUpdate>,
) -> impl IntoResponse {
    let credentials = ResellerCredentials::new(
        payload.username.unwrap_or_default(),
        payload.development_key.unwrap_or_default(),
        payload.production_key.unwrap_or_default(),
    );
    info!(
        target = "storefront::settings",
        username = %credentials.username,
        development_key = !credentials.development_key.is_empty(),
        production_key = !credentials.production_key.is_empty(),
        "reseller credentials replaced"
    );
    state.credentials.replace(credentials);

    Json(MessageResponse::new("API settings saved"))
}
