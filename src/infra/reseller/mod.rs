//! HTTP client for the reseller API.
//!
//! Every call is a signed JSON POST. Any HTTP status is read; non-2xx answers
//! become transport errors carrying the raw body, 2xx bodies are unwrapped and
//! checked for business result codes before the payload is returned.

pub mod envelope;
pub mod signing;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::counter;
use reqwest::{Client, Url, header::ACCEPT};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::application::reseller::{
    ApiMode, Balance, CredentialOverrides, PriceListEntry, ResellerGateway, SharedCredentials,
    TransactionRequest, UpstreamError, UpstreamErrorKind,
};
use crate::infra::error::InfraError;

use envelope::{ResponseEnvelope, classify};
use signing::{FALLBACK_SIGNATURE_REF, SIGNATURE_REF_FIELD, sign_payload};

pub const DEFAULT_BASE_URL: &str = "https://api.digiflazz.com";
pub const PRICE_LIST_ENDPOINT: &str = "/v1/price-list";
pub const BALANCE_ENDPOINT: &str = "/v1/cek-saldo";
pub const TRANSACTION_ENDPOINT: &str = "/v1/transaction";

const METRIC_UPSTREAM_REQUESTS: &str = "storefront_upstream_requests_total";

#[derive(Clone, Debug)]
pub struct ResellerClient {
    http: Client,
    base: Url,
    credentials: SharedCredentials,
    catalog_mode: ApiMode,
}

impl ResellerClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        credentials: SharedCredentials,
    ) -> Result<Self, InfraError> {
        let base = Url::parse(base_url).map_err(|err| {
            InfraError::configuration(format!("invalid reseller base url `{base_url}`: {err}"))
        })?;
        let http = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| {
                InfraError::configuration(format!("failed to build reseller http client: {err}"))
            })?;

        Ok(Self {
            http,
            base,
            credentials,
            catalog_mode: ApiMode::Development,
        })
    }

    /// Key used for price-list calls.
    pub fn with_catalog_mode(mut self, mode: ApiMode) -> Self {
        self.catalog_mode = mode;
        self
    }

    pub fn user_agent() -> &'static str {
        concat!("storefront/", env!("CARGO_PKG_VERSION"))
    }

    /// Signs `payload`, posts it to `endpoint` and returns the unwrapped payload.
    pub async fn request(
        &self,
        endpoint: &'static str,
        payload: Map<String, Value>,
        mode: ApiMode,
        overrides: &CredentialOverrides,
    ) -> Result<Value, UpstreamError> {
        let started = Instant::now();
        let result = self.send(endpoint, payload, mode, overrides).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(UpstreamErrorKind::Configuration) => "unconfigured",
            Err(UpstreamErrorKind::Transport { .. }) => "transport_error",
            Err(UpstreamErrorKind::Throttled) => "throttled",
            Err(UpstreamErrorKind::Business { .. }) => "business_error",
            Err(UpstreamErrorKind::Request(_)) => "request_error",
            Err(UpstreamErrorKind::Decode(_)) => "decode_error",
        };
        counter!(METRIC_UPSTREAM_REQUESTS, "endpoint" => endpoint, "outcome" => outcome)
            .increment(1);

        match &result {
            Ok(_) => debug!(
                target = "storefront::reseller",
                endpoint,
                mode = mode.as_str(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "reseller request completed"
            ),
            Err(err) => warn!(
                target = "storefront::reseller",
                endpoint,
                mode = mode.as_str(),
                outcome,
                error = %err,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "reseller request failed"
            ),
        }

        result.map_err(UpstreamError::from)
    }

    async fn send(
        &self,
        endpoint: &str,
        payload: Map<String, Value>,
        mode: ApiMode,
        overrides: &CredentialOverrides,
    ) -> Result<Value, UpstreamErrorKind> {
        let credentials = self.credentials.snapshot().with_overrides(overrides);
        let (username, key) = credentials.resolve(mode)?;
        let body = sign_payload(payload, &username, &key);
        let url = self.url(endpoint)?;

        let response = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|err| UpstreamErrorKind::Request(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| UpstreamErrorKind::Request(err.to_string()))?;
        if !status.is_success() {
            return Err(UpstreamErrorKind::Transport {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|err| UpstreamErrorKind::Decode(err.to_string()))?;
        let payload = ResponseEnvelope::from_body(body).into_payload();
        classify(&payload)?;
        Ok(payload)
    }

    fn url(&self, endpoint: &str) -> Result<Url, UpstreamErrorKind> {
        let joined = format!("{}{endpoint}", self.base.as_str().trim_end_matches('/'));
        Url::parse(&joined).map_err(|err| UpstreamErrorKind::Request(err.to_string()))
    }
}

#[async_trait]
impl ResellerGateway for ResellerClient {
    async fn price_list(&self, command: &str) -> Result<Vec<PriceListEntry>, UpstreamError> {
        let mut payload = Map::new();
        payload.insert("cmd".to_string(), Value::from(command));
        payload.insert(
            SIGNATURE_REF_FIELD.to_string(),
            Value::from(FALLBACK_SIGNATURE_REF),
        );

        let value = self
            .request(
                PRICE_LIST_ENDPOINT,
                payload,
                self.catalog_mode,
                &CredentialOverrides::default(),
            )
            .await?;
        decode(value)
    }

    async fn balance(
        &self,
        mode: ApiMode,
        overrides: &CredentialOverrides,
    ) -> Result<Balance, UpstreamError> {
        let mut payload = Map::new();
        payload.insert("cmd".to_string(), Value::from("deposit"));
        payload.insert(
            SIGNATURE_REF_FIELD.to_string(),
            Value::from(FALLBACK_SIGNATURE_REF),
        );

        let value = self
            .request(BALANCE_ENDPOINT, payload, mode, overrides)
            .await?;
        decode(value)
    }

    async fn submit_transaction(
        &self,
        request: &TransactionRequest,
        mode: ApiMode,
    ) -> Result<Value, UpstreamError> {
        let mut payload = Map::new();
        payload.insert(
            "buyer_sku_code".to_string(),
            Value::from(request.buyer_sku_code.as_str()),
        );
        payload.insert(
            "customer_no".to_string(),
            Value::from(request.customer_no.as_str()),
        );
        payload.insert("ref_id".to_string(), Value::from(request.ref_id.as_str()));
        payload.insert(
            SIGNATURE_REF_FIELD.to_string(),
            Value::from(request.ref_id.as_str()),
        );

        self.request(
            TRANSACTION_ENDPOINT,
            payload,
            mode,
            &CredentialOverrides::default(),
        )
        .await
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, UpstreamError> {
    serde_json::from_value(value)
        .map_err(|err| UpstreamError::from(UpstreamErrorKind::Decode(err.to_string())))
}
