//! Backend endpoint URLs and HTTP client construction

use std::time::Duration;

use url::Url;

use crate::config::ApiConfig;
use crate::error::{CinearcError, Result};

/// Path of the credential exchange endpoint.
pub const LOGIN_PATH: &str = "/auth/login/";
/// Path of the current-user endpoint.
pub const CURRENT_USER_PATH: &str = "/auth/user/";
/// Path of the token refresh endpoint.
pub const REFRESH_PATH: &str = "/auth/refresh/";
/// Path of the user registration collection.
pub const USERS_PATH: &str = "/users/";

/// Joins endpoint paths onto the configured API base URL.
///
/// The base may or may not end in `/`; paths may or may not start with
/// one. The result is always `{base}/{path}`.
///
/// # Examples
///
/// ```
/// use cinearc::api::endpoints::Endpoints;
///
/// let endpoints = Endpoints::new("https://cinearc.example.com/api/").unwrap();
/// assert_eq!(
///     endpoints.login().unwrap().as_str(),
///     "https://cinearc.example.com/api/auth/login/"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    /// Validates `base` and builds the endpoint set.
    ///
    /// # Errors
    ///
    /// Returns [`CinearcError::Config`] if `base` is not an absolute URL.
    pub fn new(base: &str) -> Result<Self> {
        Url::parse(base)
            .map_err(|e| CinearcError::Config(format!("Invalid API base URL '{base}': {e}")))?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Absolute URL for an arbitrary API path.
    pub fn url(&self, path: &str) -> Result<Url> {
        let joined = format!("{}/{}", self.base, path.trim_start_matches('/'));
        Ok(Url::parse(&joined)?)
    }

    /// `POST` credentials here.
    pub fn login(&self) -> Result<Url> {
        self.url(LOGIN_PATH)
    }

    /// `GET` the authenticated user here.
    pub fn current_user(&self) -> Result<Url> {
        self.url(CURRENT_USER_PATH)
    }

    /// `POST` the refresh token here.
    pub fn refresh(&self) -> Result<Url> {
        self.url(REFRESH_PATH)
    }

    /// `POST` a registration here.
    pub fn users(&self) -> Result<Url> {
        self.url(USERS_PATH)
    }
}

/// Builds the shared HTTP client with the configured timeout.
pub fn build_http_client(config: &ApiConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(concat!("cinearc/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
