use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::reseller::PriceListEntry;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: String,
    pub products_count: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionTestRequest {
    pub username: Option<String>,
    #[serde(alias = "devKey")]
    pub dev_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionTestResponse {
    pub message: String,
    pub balance: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PriceListQueryRequest {
    /// Only entries of this brand.
    pub brand: Option<String>,
    /// Price-list command; the complete list when absent.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PriceListQueryResponse {
    pub products: Vec<PriceListEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TransactionPayload {
    pub buyer_sku_code: Option<String>,
    pub customer_no: Option<String>,
    pub ref_id: Option<String>,
    /// Sign with the production key.
    pub production: bool,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub message: String,
    pub transaction: Value,
}

#[derive(Debug, Serialize)]
pub struct ApiSettingsView {
    pub username: String,
    pub development_key_configured: bool,
    pub production_key_configured: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiSettingsUpdate {
    #[serde(alias = "digiflazzUsername")]
    pub username: Option<String>,
    #[serde(alias = "digiflazzDevelopmentKey")]
    pub development_key: Option<String>,
    #[serde(alias = "digiflazzProductionKey")]
    pub production_key: Option<String>,
}
