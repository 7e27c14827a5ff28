//! Error types for CineArc
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Sentinel `code` the backend returns when a bearer token is expired or
/// malformed.
pub const TOKEN_NOT_VALID: &str = "token_not_valid";

/// Main error type for CineArc operations
///
/// This enum encompasses all possible errors that can occur while loading
/// configuration, persisting the session, talking to the backend, and
/// resolving routes.
#[derive(Error, Debug)]
pub enum CinearcError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable storage errors (file backend, directory creation)
    #[error("Storage error: {0}")]
    Storage(String),

    /// The backend answered with a non-2xx status
    #[error("API error {status}: {detail}")]
    Api {
        /// HTTP status code of the response
        status: u16,
        /// Structured error code from the response body, if any
        code: Option<String>,
        /// Human readable detail from the response body (or the raw body)
        detail: String,
    },

    /// Exchanging the refresh token for a new access token failed
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// A refresh was requested but no refresh token is held
    #[error("No refresh token available")]
    MissingRefreshToken,

    /// The locally held access token could not be decoded
    #[error("Token decode error: {0}")]
    TokenDecode(String),

    /// The backend rejected the supplied credentials
    #[error("Login failed for user: {0}")]
    LoginRejected(String),

    /// A command-line argument could not be interpreted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No route matches the requested path
    #[error("No route matches path: {0}")]
    RouteNotFound(String),

    /// The guard kept redirecting without settling on a route
    #[error("Too many redirects while navigating to {0}")]
    RedirectLoop(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL construction errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl CinearcError {
    /// Returns `true` when this is an API error carrying the
    /// [`TOKEN_NOT_VALID`] code.
    ///
    /// # Examples
    ///
    /// ```
    /// use cinearc::error::CinearcError;
    ///
    /// let err = CinearcError::Api {
    ///     status: 401,
    ///     code: Some("token_not_valid".to_string()),
    ///     detail: "Given token not valid for any token type".to_string(),
    /// };
    /// assert!(err.is_token_not_valid());
    /// ```
    pub fn is_token_not_valid(&self) -> bool {
        matches!(self, CinearcError::Api { code: Some(code), .. } if code == TOKEN_NOT_VALID)
    }
}

/// Result type alias for CineArc operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation. Callers that
/// need to classify a failure use `downcast_ref::<CinearcError>()`.
pub type Result<T> = anyhow::Result<T>;
