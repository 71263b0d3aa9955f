//! Request signing: an `auth` block in the params plus an HMAC-SHA384 signature over them.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha384;
use transloadit_types::Credentials;

type HmacSha384 = Hmac<Sha384>;

const SIGNATURE_PREFIX: &str = "sha384:";
const EXPIRES_FORMAT: &str = "%Y/%m/%d %H:%M:%S+00:00";

/// Signatures stay valid for one hour after signing.
const SIGNATURE_TTL_SECS: i64 = 3600;

/// Serialized params and their signature, sent as the `params` / `signature` fields.
#[derive(Debug, Clone)]
pub struct SignedParams {
    pub params: String,
    pub signature: String,
}

/// Insert `auth = {key, expires}` into `params`, serialize, and sign with the secret.
pub fn sign_params(
    credentials: &Credentials,
    mut params: serde_json::Map<String, serde_json::Value>,
    now: DateTime<Utc>,
) -> SignedParams {
    let expires = (now + Duration::seconds(SIGNATURE_TTL_SECS))
        .format(EXPIRES_FORMAT)
        .to_string();
    params.insert(
        "auth".to_string(),
        serde_json::json!({ "key": credentials.key(), "expires": expires }),
    );
    let params = serde_json::Value::Object(params).to_string();
    let signature = format!("{SIGNATURE_PREFIX}{}", hmac_hex(credentials.secret(), &params));
    SignedParams { params, signature }
}

/// Check a `signature` field against the serialized `params` it was sent with.
pub fn verify_signature(secret: &str, params: &str, signature: &str) -> bool {
    match signature.strip_prefix(SIGNATURE_PREFIX) {
        Some(hex_digest) => hex_digest.eq_ignore_ascii_case(&hmac_hex(secret, params)),
        None => false,
    }
}

fn hmac_hex(secret: &str, payload: &str) -> String {
    let mut mac =
        HmacSha384::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
