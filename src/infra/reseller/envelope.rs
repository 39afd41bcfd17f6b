//! Response bodies of the reseller API and their result codes.

use serde_json::Value;

use crate::application::reseller::{SUCCESS_CODE, THROTTLED_CODE, UpstreamErrorKind};

/// Shape of a successful (2xx) response body.
///
/// Most endpoints wrap their payload as `{"data": ...}`; some answer with the
/// payload itself. A `data` member that is `null` counts as flat.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    Wrapped(Value),
    Flat(Value),
}

impl ResponseEnvelope {
    pub fn from_body(body: Value) -> Self {
        match body {
            Value::Object(mut map) if map.get("data").is_some_and(|data| !data.is_null()) => {
                Self::Wrapped(map.remove("data").unwrap_or(Value::Null))
            }
            other => Self::Flat(other),
        }
    }

    pub fn into_payload(self) -> Value {
        match self {
            Self::Wrapped(payload) | Self::Flat(payload) => payload,
        }
    }
}

/// Business classification of a payload by its `rc` result code.
///
/// Payloads without a code (the price list is an array) pass.
pub fn classify(payload: &Value) -> Result<(), UpstreamErrorKind> {
    let Some(code) = result_code(payload) else {
        return Ok(());
    };
    if code == THROTTLED_CODE {
        return Err(UpstreamErrorKind::Throttled);
    }
    if code.is_empty() || code == SUCCESS_CODE {
        return Ok(());
    }

    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    Err(UpstreamErrorKind::Business { code, message })
}

fn result_code(payload: &Value) -> Option<String> {
    match payload.get("rc")? {
        Value::String(code) => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}
