//! Authenticated API client with refresh-and-retry
//!
//! Every call goes through [`ApiClient::send`], which attaches the current
//! access token as a bearer credential. When the backend rejects the token
//! with `code: "token_not_valid"` the client refreshes once and replays the
//! call once:
//!
//! 1. The failure must carry the `token_not_valid` code, a refresh token
//!    must be held, and the call must still be on [`Attempt::Initial`].
//! 2. The call moves to [`Attempt::Retried`], so the replay can never
//!    trigger another refresh.
//! 3. If another task already replaced the token the call was sent with,
//!    the replay uses the current token without refreshing again.
//!    Otherwise [`AuthManager::refresh`] runs (or joins the refresh that is
//!    already running).
//! 4. A refresh failure is returned in place of the original error; the
//!    manager has already logged the session out.
//!
//! Any other failure is returned unchanged.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::endpoints::Endpoints;
use crate::api::response::{check_response, read_json};
use crate::auth::manager::AuthManager;
use crate::auth::token_store::TokenStore;
use crate::error::{CinearcError, Result};

/// A replayable description of one API call.
///
/// Requests are never mutated by the client; a retry rebuilds the HTTP
/// request from this value with a different token.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the API base, e.g. `/sessions/`.
    pub path: String,
    /// Query string pairs.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// A request with no query and no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends a query pair.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Replaces the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Where a call is in the refresh-and-retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// First submission; a token failure may trigger a refresh.
    Initial,
    /// Replay after a refresh; failures are returned as-is.
    Retried,
}

/// HTTP client that applies the session's bearer token and the refresh
/// policy to every call.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    store: Arc<TokenStore>,
    auth: AuthManager,
}

impl ApiClient {
    /// Creates a client sharing `store` with `auth`.
    pub fn new(
        http: reqwest::Client,
        endpoints: Endpoints,
        store: Arc<TokenStore>,
        auth: AuthManager,
    ) -> Self {
        Self {
            http,
            endpoints,
            store,
            auth,
        }
    }

    /// Sends `request` and returns the JSON response body
    /// (`Value::Null` when empty).
    ///
    /// # Errors
    ///
    /// Returns [`CinearcError::Api`] for non-2xx responses that are not
    /// recovered by a refresh, [`CinearcError::RefreshFailed`] when the
    /// recovery refresh fails, and transport errors otherwise.
    pub async fn send(&self, request: &ApiRequest) -> Result<Value> {
        let mut attempt = Attempt::Initial;
        let mut token = self.store.access_token();

        loop {
            let err = match self.dispatch(request, token.as_deref(), attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !self.should_refresh(&err, attempt) {
                return Err(err);
            }

            attempt = Attempt::Retried;
            let current = self.store.access_token();
            token = if current.is_some() && current != token {
                tracing::debug!(path = %request.path, "Token already replaced; retrying without refresh");
                current
            } else {
                tracing::debug!(path = %request.path, "Access token rejected; refreshing");
                Some(self.auth.refresh().await?)
            };
        }
    }

    /// [`send`](Self::send) and deserialize the body into `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        let value = self.send(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `GET path`, deserialized into `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(&ApiRequest::get(path)).await
    }

    fn should_refresh(&self, err: &anyhow::Error, attempt: Attempt) -> bool {
        attempt == Attempt::Initial
            && err
                .downcast_ref::<CinearcError>()
                .is_some_and(CinearcError::is_token_not_valid)
            && self.store.refresh_token().is_some()
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
        attempt: Attempt,
    ) -> Result<Value> {
        let url = self.endpoints.url(&request.path)?;
        tracing::debug!(method = %request.method, %url, ?attempt, "Sending API request");

        let mut builder = self.http.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = check_response(builder.send().await?).await?;
        read_json(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_request_builders() {
        let req = ApiRequest::get("/movies/").with_query("page", "2");
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.query, vec![("page".to_string(), "2".to_string())]);
        assert!(req.body.is_none());

        let req = ApiRequest::post("/basket/", json!({"session": 1}));
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.body, Some(json!({"session": 1})));

        assert_eq!(ApiRequest::delete("/basket/1/").method, Method::DELETE);
        assert_eq!(ApiRequest::put("/x/", json!({})).method, Method::PUT);
        assert_eq!(ApiRequest::patch("/x/", json!({})).method, Method::PATCH);
    }

    #[test]
    fn test_api_request_clone_is_independent() {
        let original = ApiRequest::get("/sessions/");
        let mut copy = original.clone();
        copy.path = "/basket/".to_string();
        assert_eq!(original.path, "/sessions/");
    }
}
