//! Reseller gateway seam: request/response types, credentials and the upstream
//! error taxonomy shared by the HTTP client and its callers.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::error::DomainError;
use crate::util::lock::{rw_read, rw_write};

/// `cmd` value requesting the complete price list.
pub const PRICE_LIST_ALL: &str = "all";

/// Result code the reseller uses when price-list checks are rate limited.
pub const THROTTLED_CODE: &str = "83";

/// Result code of a successful call.
pub const SUCCESS_CODE: &str = "00";

/// Every failure of a reseller call. Displays with a uniform prefix so callers
/// can surface it verbatim; [`UpstreamError::kind`] keeps the classification.
#[derive(Debug, Clone, Error)]
#[error("connection to upstream failed: {kind}")]
pub struct UpstreamError {
    kind: UpstreamErrorKind,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    #[error("reseller username or API key is not configured")]
    Configuration,
    #[error("HTTP {status} from upstream: {body}")]
    Transport { status: u16, body: String },
    #[error("price list check limit reached, try again shortly (RC: 83)")]
    Throttled,
    #[error("upstream rejected the request: {message} (RC: {code})")]
    Business { code: String, message: String },
    #[error("request could not be completed: {0}")]
    Request(String),
    #[error("unexpected response payload: {0}")]
    Decode(String),
}

impl UpstreamError {
    pub fn kind(&self) -> &UpstreamErrorKind {
        &self.kind
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self.kind, UpstreamErrorKind::Throttled)
    }
}

impl From<UpstreamErrorKind> for UpstreamError {
    fn from(kind: UpstreamErrorKind) -> Self {
        Self { kind }
    }
}

/// Which reseller key signs a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiMode {
    #[default]
    Development,
    Production,
}

impl ApiMode {
    pub fn from_production_flag(production: bool) -> Self {
        if production {
            Self::Production
        } else {
            Self::Development
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApiMode::Development => "development",
            ApiMode::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResellerCredentials {
    pub username: String,
    pub development_key: String,
    pub production_key: String,
}

impl ResellerCredentials {
    pub fn new(
        username: impl AsRef<str>,
        development_key: impl AsRef<str>,
        production_key: impl AsRef<str>,
    ) -> Self {
        Self {
            username: username.as_ref().trim().to_string(),
            development_key: development_key.as_ref().trim().to_string(),
            production_key: production_key.as_ref().trim().to_string(),
        }
    }

    pub fn with_overrides(&self, overrides: &CredentialOverrides) -> Self {
        Self {
            username: overrides
                .username
                .clone()
                .unwrap_or_else(|| self.username.clone()),
            development_key: overrides
                .development_key
                .clone()
                .unwrap_or_else(|| self.development_key.clone()),
            production_key: overrides
                .production_key
                .clone()
                .unwrap_or_else(|| self.production_key.clone()),
        }
    }

    /// Username and mode-selected key, both trimmed and non-blank.
    pub fn resolve(&self, mode: ApiMode) -> Result<(String, String), UpstreamErrorKind> {
        let username = self.username.trim();
        let key = match mode {
            ApiMode::Development => self.development_key.trim(),
            ApiMode::Production => self.production_key.trim(),
        };
        if username.is_empty() || key.is_empty() {
            return Err(UpstreamErrorKind::Configuration);
        }
        Ok((username.to_string(), key.to_string()))
    }
}

/// Per-call replacements for configured credentials; `None` keeps the configured value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialOverrides {
    pub username: Option<String>,
    pub development_key: Option<String>,
    pub production_key: Option<String>,
}

/// Trims `value`, treating blank strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Process-local credential cell shared by the client and the settings endpoints.
#[derive(Debug, Clone, Default)]
pub struct SharedCredentials {
    inner: Arc<RwLock<ResellerCredentials>>,
}

impl SharedCredentials {
    pub fn new(credentials: ResellerCredentials) -> Self {
        Self {
            inner: Arc::new(RwLock::new(credentials)),
        }
    }

    pub fn snapshot(&self) -> ResellerCredentials {
        rw_read(&self.inner, "application::reseller", "credentials.snapshot").clone()
    }

    pub fn replace(&self, credentials: ResellerCredentials) {
        *rw_write(&self.inner, "application::reseller", "credentials.replace") = credentials;
    }
}

/// One raw price-list entry. Unknown upstream fields are kept so the entry can
/// be passed through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PriceListEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub buyer_sku_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub product_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub brand: String,
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(deserialize_with = "null_as_default")]
    pub price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_product_status: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_product_status: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub deposit: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub buyer_sku_code: String,
    pub customer_no: String,
    pub ref_id: String,
}

impl TransactionRequest {
    pub fn new(
        buyer_sku_code: Option<String>,
        customer_no: Option<String>,
        ref_id: Option<String>,
    ) -> Result<Self, DomainError> {
        match (
            non_blank(buyer_sku_code),
            non_blank(customer_no),
            non_blank(ref_id),
        ) {
            (Some(buyer_sku_code), Some(customer_no), Some(ref_id)) => Ok(Self {
                buyer_sku_code,
                customer_no,
                ref_id,
            }),
            _ => Err(DomainError::validation(
                "buyer_sku_code, customer_no and ref_id are required",
            )),
        }
    }
}

/// Reseller operations used by the storefront.
#[async_trait]
pub trait ResellerGateway: Send + Sync {
    /// Price list for `command` (`"all"` for the full catalog).
    async fn price_list(&self, command: &str) -> Result<Vec<PriceListEntry>, UpstreamError>;

    async fn balance(
        &self,
        mode: ApiMode,
        overrides: &CredentialOverrides,
    ) -> Result<Balance, UpstreamError>;

    /// Submits a top-up order and returns the upstream transaction payload.
    async fn submit_transaction(
        &self,
        request: &TransactionRequest,
        mode: ApiMode,
    ) -> Result<Value, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_trims_and_selects_key_by_mode() {
        let credentials = ResellerCredentials {
            username: " shop ".to_string(),
            development_key: "dev-key ".to_string(),
            production_key: " prod-key".to_string(),
        };

        assert_eq!(
            credentials.resolve(ApiMode::Development),
            Ok(("shop".to_string(), "dev-key".to_string()))
        );
        assert_eq!(
            credentials.resolve(ApiMode::Production),
            Ok(("shop".to_string(), "prod-key".to_string()))
        );
    }

    #[test]
    fn blank_credentials_are_a_configuration_error() {
        let credentials = ResellerCredentials::new("shop", "   ", "");
        assert_eq!(
            credentials.resolve(ApiMode::Development),
            Err(UpstreamErrorKind::Configuration)
        );

        let no_user = ResellerCredentials::new(" ", "dev", "prod");
        assert_eq!(
            no_user.resolve(ApiMode::Production),
            Err(UpstreamErrorKind::Configuration)
        );
    }

    #[test]
    fn overrides_replace_fields_individually() {
        let configured = ResellerCredentials::new("shop", "dev", "prod");
        let overrides = CredentialOverrides {
            username: Some("tester".to_string()),
            development_key: None,
            production_key: None,
        };

        let merged = configured.with_overrides(&overrides);
        assert_eq!(merged.username, "tester");
        assert_eq!(merged.development_key, "dev");
    }

    #[test]
    fn upstream_errors_share_a_prefix() {
        let error = UpstreamError::from(UpstreamErrorKind::Business {
            code: "44".to_string(),
            message: "Saldo tidak cukup".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "connection to upstream failed: upstream rejected the request: Saldo tidak cukup (RC: 44)"
        );
        assert!(UpstreamError::from(UpstreamErrorKind::Throttled).is_throttled());
    }

    #[test]
    fn transaction_request_requires_identifiers() {
        let err = TransactionRequest::new(
            Some("ML5".into()),
            Some(" ".into()),
            Some("INV-1".into()),
        )
        .expect_err("blank customer number");
        assert!(matches!(err, DomainError::Validation { .. }));

        let ok = TransactionRequest::new(
            Some("ML5".into()),
            Some("12345678".into()),
            Some("INV-1".into()),
        )
        .expect("valid request");
        assert_eq!(ok.ref_id, "INV-1");
    }

    #[test]
    fn price_list_entry_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "buyer_sku_code": "ML5",
            "product_name": "5 Diamonds",
            "brand": "MOBILE LEGENDS",
            "category": "Games",
            "price": 1500,
            "type": "Umum",
            "seller_name": "Reseller A"
        });
        let entry: PriceListEntry = serde_json::from_value(raw.clone()).expect("entry");
        assert_eq!(entry.kind.as_deref(), Some("Umum"));
        assert_eq!(
            entry.extra.get("seller_name"),
            Some(&Value::from("Reseller A"))
        );
        assert_eq!(serde_json::to_value(&entry).expect("serialize"), raw);
    }

    #[test]
    fn price_list_entry_reads_null_fields_as_defaults() {
        let raw = serde_json::json!({
            "buyer_sku_code": "FF5",
            "product_name": null,
            "brand": "FREE FIRE",
            "category": null,
            "price": null,
            "status": null
        });
        let entry: PriceListEntry = serde_json::from_value(raw).expect("entry");
        assert_eq!(entry.buyer_sku_code, "FF5");
        assert!(entry.product_name.is_empty());
        assert!(entry.category.is_empty());
        assert_eq!(entry.price, 0);
        assert_eq!(entry.status, None);
    }
}
