//! Request signing for the reseller API.
//!
//! Each call is signed with `md5_hex(username + key + reference)`. The
//! reference is chosen per call and travels in the payload under
//! [`SIGNATURE_REF_FIELD`]; it is consumed here and never sent upstream.

use md5::{Digest, Md5};
use serde_json::{Map, Value};

/// Internal payload field carrying the signature reference.
pub const SIGNATURE_REF_FIELD: &str = "__sig_ref";
/// Internal payload field marking a sandbox order; stripped before sending.
pub const TESTING_FIELD: &str = "testing";
/// Reference used for calls that carry neither a reference nor a SKU.
pub const FALLBACK_SIGNATURE_REF: &str = "depo";

const SKU_FIELD: &str = "buyer_sku_code";

pub fn signature(username: &str, key: &str, reference: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(username.as_bytes());
    hasher.update(key.as_bytes());
    hasher.update(reference.as_bytes());
    hex::encode(hasher.finalize())
}

/// Reference for `payload`: explicit `__sig_ref`, else `buyer_sku_code`, else `"depo"`.
pub fn signature_reference(payload: &Map<String, Value>) -> String {
    payload
        .get(SIGNATURE_REF_FIELD)
        .and_then(reference_text)
        .or_else(|| payload.get(SKU_FIELD).and_then(reference_text))
        .unwrap_or_else(|| FALLBACK_SIGNATURE_REF.to_string())
}

/// Outbound body: `payload` without internal fields, plus `username` and `sign`.
pub fn sign_payload(
    mut payload: Map<String, Value>,
    username: &str,
    key: &str,
) -> Map<String, Value> {
    let reference = signature_reference(&payload);
    payload.remove(SIGNATURE_REF_FIELD);
    payload.remove(TESTING_FIELD);

    payload.insert("username".to_string(), Value::from(username));
    payload.insert(
        "sign".to_string(),
        Value::from(signature(username, key, &reference)),
    );
    payload
}

fn reference_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn signature_is_md5_of_concatenation() {
        assert_eq!(signature("a", "b", "c"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn reference_prefers_explicit_then_sku_then_fallback() {
        let explicit = object(json!({"__sig_ref": "INV-1", "buyer_sku_code": "ML5"}));
        assert_eq!(signature_reference(&explicit), "INV-1");

        let sku = object(json!({"__sig_ref": null, "buyer_sku_code": "ML5"}));
        assert_eq!(signature_reference(&sku), "ML5");

        let neither = object(json!({"cmd": "deposit"}));
        assert_eq!(signature_reference(&neither), FALLBACK_SIGNATURE_REF);
    }

    #[test]
    fn signed_payload_drops_internal_fields() {
        let payload = object(json!({
            "cmd": "all",
            "__sig_ref": "depo",
            "testing": true
        }));

        let signed = sign_payload(payload, "shop", "secret");
        assert_eq!(
            Value::Object(signed),
            json!({
                "cmd": "all",
                "username": "shop",
                "sign": signature("shop", "secret", "depo")
            })
        );
    }
}
