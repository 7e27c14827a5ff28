//! Response classification
//!
//! Turns non-2xx responses into [`CinearcError::Api`] using the backend's
//! structured error body (`{"detail": ..., "code": ...}`), and reads JSON
//! bodies that may be empty.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CinearcError, Result};

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    code: Option<String>,
}

/// Builds the API error for a failed response from its status and body.
pub fn api_error(status: reqwest::StatusCode, body: &str) -> CinearcError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let detail = match parsed.detail {
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };

    CinearcError::Api {
        status: status.as_u16(),
        code: parsed.code,
        detail,
    }
}

/// Passes 2xx responses through; converts anything else into
/// [`CinearcError::Api`].
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(api_error(status, &body).into())
}

/// Reads a JSON body, mapping an empty body (e.g. `204 No Content`) to
/// `Value::Null`.
pub async fn read_json(resp: reqwest::Response) -> Result<Value> {
    let bytes = resp.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
