//! Request signing for Crypto.com Exchange private endpoints
//!
//! Private endpoints take a JSON envelope `{id, method, api_key, params,
//! nonce, sig}` where `sig` is an HMAC-SHA256 over the concatenation of
//! method, request id, API key, the canonical parameter string, and the
//! nonce, keyed by the API secret and hex-encoded in lowercase.
//!
//! The canonical parameter string sorts keys lexicographically and joins
//! each key with its value's string form, with no delimiters. Nested
//! objects apply the same rule recursively, so two parameter maps with the
//! same contents always sign identically regardless of insertion order.

use std::sync::atomic::{AtomicU64, Ordering};

use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Process-wide request id counter, used for request/response correlation
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// API credentials for private endpoints
#[derive(Debug, Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Load credentials from `CRYPTOCOM_API_KEY` and `CRYPTOCOM_API_SECRET`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("CRYPTOCOM_API_KEY")
            .map_err(|_| Error::Config("CRYPTOCOM_API_KEY is not set".to_string()))?;
        let api_secret = std::env::var("CRYPTOCOM_API_SECRET")
            .map_err(|_| Error::Config("CRYPTOCOM_API_SECRET is not set".to_string()))?;
        Ok(Self::new(api_key, api_secret))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

/// Signed request body for a private endpoint
///
/// Field names match the wire contract the exchange verifies signatures
/// against, so this struct serializes directly as the POST body.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    pub id: u64,
    pub method: String,
    pub api_key: String,
    pub params: Map<String, Value>,
    pub nonce: i64,
    pub sig: String,
}

/// Build and sign a request envelope with a fresh id and nonce
pub fn build_envelope(
    method: &str,
    params: Map<String, Value>,
    credentials: &Credentials,
) -> Result<RequestEnvelope> {
    let id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
    let nonce = chrono::Utc::now().timestamp_millis();
    let sig = sign_payload(
        method,
        id,
        credentials.api_key(),
        &params,
        nonce,
        credentials.api_secret(),
    )?;

    Ok(RequestEnvelope {
        id,
        method: method.to_string(),
        api_key: credentials.api_key().to_string(),
        params,
        nonce,
        sig,
    })
}

/// Compute the request signature for the given envelope fields
///
/// Pure function of its inputs: signing the same fields twice yields the
/// same signature.
pub fn sign_payload(
    method: &str,
    id: u64,
    api_key: &str,
    params: &Map<String, Value>,
    nonce: i64,
    api_secret: &str,
) -> Result<String> {
    if api_secret.is_empty() {
        return Err(Error::Config(
            "api_secret is empty; refusing to sign request".to_string(),
        ));
    }

    let payload = format!(
        "{}{}{}{}{}",
        method,
        id,
        api_key,
        canonical_params(params),
        nonce
    );

    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .map_err(|e| Error::Signature(format!("invalid HMAC key: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Serialize a parameter map into its canonical signature form
pub fn canonical_params(params: &Map<String, Value>) -> String {
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort_unstable();

    let mut out = String::new();
    for key in keys {
        out.push_str(key);
        out.push_str(&canonical_value(&params[key]));
    }
    out
}

fn canonical_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(canonical_value).collect(),
        Value::Object(map) => canonical_params(map),
    }
}
