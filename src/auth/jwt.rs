//! Unverified access token claims decoding
//!
//! The client never holds the signing key, so the payload is decoded only to
//! read the `exp` claim for the startup expiry check. Any structural problem
//! (wrong number of segments, bad base64url, non-JSON payload, missing
//! `exp`) is an error, and [`is_expired_at`] treats every error as expired.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CinearcError, Result};

/// Claims the client reads from an access token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,

    /// Token type, `"access"` for tokens issued by the login endpoint.
    #[serde(default)]
    pub token_type: Option<String>,

    /// Token identifier.
    #[serde(default)]
    pub jti: Option<String>,
}

impl AccessClaims {
    /// Returns the expiration as a `DateTime<Utc>`, if representable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Decodes the payload segment of a `header.payload.signature` token.
///
/// The signature is not verified.
///
/// # Errors
///
/// Returns [`CinearcError::TokenDecode`] when the token is not three
/// non-empty dot-separated segments, the payload is not base64url, or the
/// JSON lacks a numeric `exp`.
///
/// # Examples
///
/// ```
/// use base64::Engine as _;
/// use cinearc::auth::jwt::decode_claims;
///
/// let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
///     .encode(br#"{"exp":1700000000,"token_type":"access"}"#);
/// let token = format!("h.{payload}.s");
///
/// let claims = decode_claims(&token).unwrap();
/// assert_eq!(claims.exp, 1_700_000_000);
/// assert!(decode_claims("not-a-token").is_err());
/// ```
pub fn decode_claims(token: &str) -> Result<AccessClaims> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(CinearcError::TokenDecode(format!(
            "expected 3 non-empty segments, found {}",
            segments.len()
        ))
        .into());
    }

    // Some issuers pad their segments; the URL-safe engine here does not
    // accept padding.
    let payload = segments[1].trim_end_matches('=');
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| CinearcError::TokenDecode(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| CinearcError::TokenDecode(format!("payload is not valid claims: {e}")).into())
}

/// Returns `true` when `token` is expired at `now_ms` (milliseconds since
/// epoch) or cannot be decoded.
///
/// A token is expired once `exp * 1000 <= now_ms`.
pub fn is_expired_at(token: &str, now_ms: i64) -> bool {
    match decode_claims(token) {
        Ok(claims) => claims.exp.saturating_mul(1000) <= now_ms,
        Err(e) => {
            tracing::debug!(error = %e, "Access token could not be decoded; treating as expired");
            true
        }
    }
}

/// [`is_expired_at`] against the current wall clock.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now().timestamp_millis())
}
