//! Authentication session manager
//!
//! [`AuthManager`] is the only component that writes tokens. It owns the
//! login, registration, current-user, refresh, and logout operations, plus
//! the startup expiry check:
//!
//! - [`AuthManager::login`] -- exchanges credentials for a token pair and
//!   commits it together with the user; returns `false` on any failure
//!   without touching the session.
//! - [`AuthManager::fetch_user`] -- best-effort enrichment of the session
//!   user; failures are logged and swallowed.
//! - [`AuthManager::refresh`] -- exchanges the refresh token for a new
//!   access token. Concurrent callers share one in-flight request. A failed
//!   refresh logs the session out.
//! - [`AuthManager::logout`] -- clears the session and requests a redirect
//!   to `/login`. Idempotent.
//! - [`AuthManager::check_startup_expiry`] -- logs out when the held access
//!   token is expired or undecodable.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};

use crate::api::endpoints::Endpoints;
use crate::api::response::check_response;
use crate::auth::jwt;
use crate::auth::token_store::{TokenStore, User};
use crate::error::{CinearcError, Result};
use crate::router::navigator::Navigator;
use crate::router::routes::LOGIN_PATH;

/// Username/password pair posted to the login endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// New account details posted to the users endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
    user_id: u64,
    username: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    /// Present when the backend rotates refresh tokens.
    #[serde(default)]
    refresh: Option<String>,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// Outcome shared by every waiter of one refresh. The error side is the
/// rendered message so that it can be cloned to all waiters.
type RefreshFuture = Shared<BoxFuture<'static, std::result::Result<String, String>>>;

struct Inner {
    http: reqwest::Client,
    endpoints: Endpoints,
    store: Arc<TokenStore>,
    navigator: Arc<Navigator>,
    /// `None` while idle; holds the running refresh otherwise.
    in_flight: Mutex<Option<RefreshFuture>>,
}

/// Coordinator for the session's token lifecycle.
///
/// Cloning is cheap and every clone shares the same state, including the
/// in-flight refresh.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use cinearc::api::endpoints::Endpoints;
/// use cinearc::auth::manager::{AuthManager, Credentials};
/// use cinearc::auth::storage::MemoryStorage;
/// use cinearc::auth::token_store::TokenStore;
/// use cinearc::router::navigator::Navigator;
///
/// # async fn example() -> cinearc::error::Result<()> {
/// let store = Arc::new(TokenStore::new(Arc::new(MemoryStorage::new())));
/// let manager = AuthManager::new(
///     reqwest::Client::new(),
///     Endpoints::new("http://localhost:8000/api")?,
///     store,
///     Arc::new(Navigator::new()),
/// );
///
/// if manager.login(&Credentials::new("ada", "secret")).await {
///     manager.fetch_user().await;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuthManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("endpoints", &self.inner.endpoints)
            .field("store", &self.inner.store)
            .finish()
    }
}

impl AuthManager {
    /// Creates a manager writing to `store` and redirecting via `navigator`.
    pub fn new(
        http: reqwest::Client,
        endpoints: Endpoints,
        store: Arc<TokenStore>,
        navigator: Arc<Navigator>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                endpoints,
                store,
                navigator,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// The store this manager writes to.
    pub fn store(&self) -> &Arc<TokenStore> {
        &self.inner.store
    }

    /// Posts `credentials` to the login endpoint and commits the returned
    /// tokens and user.
    ///
    /// Returns `false` on network errors, non-2xx responses, and malformed
    /// or empty token payloads. Nothing is committed unless the whole
    /// response is valid.
    /// A successful login also drops any redirect still pending from the
    /// previous session.
    pub async fn login(&self, credentials: &Credentials) -> bool {
        match self.request_login(credentials).await {
            Ok(resp) => {
                let store = &self.inner.store;
                store.set_access(&resp.access);
                store.set_refresh(&resp.refresh);
                store.set_user(Some(User::new(resp.user_id, resp.username)));
                if let Some(stale) = self.inner.navigator.take_pending() {
                    tracing::debug!(to = %stale, "Dropping redirect left by the previous session");
                }
                tracing::info!(user_id = resp.user_id, "Logged in");
                true
            }
            Err(e) => {
                tracing::warn!(username = %credentials.username, error = %e, "Login failed");
                false
            }
        }
    }

    async fn request_login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        let resp = self
            .inner
            .http
            .post(self.inner.endpoints.login()?)
            .json(credentials)
            .send()
            .await?;
        let body: LoginResponse = check_response(resp).await?.json().await?;

        if body.access.is_empty() || body.refresh.is_empty() {
            return Err(CinearcError::Api {
                status: 200,
                code: None,
                detail: "login response is missing tokens".to_string(),
            }
            .into());
        }
        Ok(body)
    }

    /// Creates an account. The session is left unchanged; call
    /// [`login`](Self::login) afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`CinearcError::Api`] with the backend's validation message
    /// when the registration is rejected, or a transport error.
    pub async fn register(&self, registration: &Registration) -> Result<User> {
        let resp = self
            .inner
            .http
            .post(self.inner.endpoints.users()?)
            .json(registration)
            .send()
            .await?;
        let user: User = check_response(resp).await?.json().await?;
        tracing::info!(user_id = user.id, username = %user.username, "Registered account");
        Ok(user)
    }

    /// Loads the current user into the session.
    ///
    /// Does nothing without an access token. Failures are logged at `warn`
    /// and otherwise ignored. The user is only committed if the session is
    /// still authenticated when the response arrives.
    pub async fn fetch_user(&self) {
        let Some(access) = self.inner.store.access_token() else {
            tracing::debug!("No access token; skipping user fetch");
            return;
        };

        match self.request_user(&access).await {
            Ok(user) => {
                if self.inner.store.is_authenticated() {
                    tracing::debug!(user_id = user.id, "Fetched current user");
                    self.inner.store.set_user(Some(user));
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to fetch current user"),
        }
    }

    async fn request_user(&self, access: &str) -> Result<User> {
        let resp = self
            .inner
            .http
            .get(self.inner.endpoints.current_user()?)
            .bearer_auth(access)
            .send()
            .await?;
        Ok(check_response(resp).await?.json().await?)
    }

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// If a refresh is already running, this waits for it and returns the
    /// same outcome instead of issuing another request.
    ///
    /// # Errors
    ///
    /// Returns [`CinearcError::RefreshFailed`] when there is no refresh
    /// token, the endpoint is unreachable, or it rejects the token. The
    /// session has been logged out by the time the error is returned.
    ///
    /// If the session is logged out or replaced while the request is in
    /// flight, the new token is discarded and `RefreshFailed` is returned
    /// without touching the current session.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use cinearc::api::endpoints::Endpoints;
    /// use cinearc::auth::manager::AuthManager;
    /// use cinearc::auth::storage::MemoryStorage;
    /// use cinearc::auth::token_store::TokenStore;
    /// use cinearc::router::navigator::Navigator;
    ///
    /// # tokio_test::block_on(async {
    /// let store = Arc::new(TokenStore::new(Arc::new(MemoryStorage::new())));
    /// let navigator = Arc::new(Navigator::new());
    /// let manager = AuthManager::new(
    ///     reqwest::Client::new(),
    ///     Endpoints::new("http://127.0.0.1:9").unwrap(),
    ///     store,
    ///     Arc::clone(&navigator),
    /// );
    ///
    /// // Nothing to exchange: the refresh fails and the session is logged out.
    /// assert!(manager.refresh().await.is_err());
    /// assert_eq!(navigator.pending().as_deref(), Some("/login"));
    /// # });
    /// ```
    pub async fn refresh(&self) -> Result<String> {
        self.join_or_start_refresh()
            .await
            .map_err(|msg| CinearcError::RefreshFailed(msg).into())
    }

    fn join_or_start_refresh(&self) -> RefreshFuture {
        let mut slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(running) = slot.as_ref() {
            tracing::debug!("Joining in-flight token refresh");
            return running.clone();
        }

        let manager = self.clone();
        let refresh = async move {
            let outcome = manager.perform_refresh().await;
            manager
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            outcome
        }
        .boxed()
        .shared();

        *slot = Some(refresh.clone());
        refresh
    }

    async fn perform_refresh(&self) -> std::result::Result<String, String> {
        match self.exchange_refresh_token().await {
            Ok(Some(access)) => {
                tracing::info!("Access token refreshed");
                Ok(access)
            }
            Ok(None) => {
                tracing::info!("Session changed while refreshing; discarding new token");
                Err("session changed while the refresh was in flight".to_string())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed; logging out");
                self.logout();
                Err(e.to_string())
            }
        }
    }

    /// Returns `Ok(None)` when the session no longer holds the refresh
    /// token that was sent, e.g. after a logout during the request.
    async fn exchange_refresh_token(&self) -> Result<Option<String>> {
        let refresh = self
            .inner
            .store
            .refresh_token()
            .ok_or(CinearcError::MissingRefreshToken)?;

        let resp = self
            .inner
            .http
            .post(self.inner.endpoints.refresh()?)
            .json(&RefreshRequest { refresh: &refresh })
            .send()
            .await?;
        let body: RefreshResponse = check_response(resp).await?.json().await?;

        if body.access.is_empty() {
            return Err(CinearcError::RefreshFailed(
                "refresh response has an empty access token".to_string(),
            )
            .into());
        }

        let committed =
            self.inner
                .store
                .commit_refresh(&refresh, &body.access, body.refresh.as_deref());
        Ok(committed.then_some(body.access))
    }

    /// Clears the session and requests a redirect to `/login`.
    ///
    /// Safe to call when already logged out; the redirect is still
    /// requested.
    pub fn logout(&self) {
        let was_authenticated = self.inner.store.is_authenticated();
        self.inner.store.clear();
        self.inner.navigator.redirect_to(LOGIN_PATH);
        if was_authenticated {
            tracing::info!("Logged out");
        } else {
            tracing::debug!("Logout requested with no active session");
        }
    }

    /// Startup check: logs out if the held access token is expired at
    /// `now_ms` or cannot be decoded. Returns whether a logout happened.
    pub fn check_startup_expiry_at(&self, now_ms: i64) -> bool {
        let Some(access) = self.inner.store.access_token() else {
            return false;
        };

        if jwt::is_expired_at(&access, now_ms) {
            tracing::info!("Stored access token is expired or malformed; logging out");
            self.logout();
            true
        } else {
            false
        }
    }

    /// [`check_startup_expiry_at`](Self::check_startup_expiry_at) against
    /// the current wall clock.
    pub fn check_startup_expiry(&self) -> bool {
        self.check_startup_expiry_at(Utc::now().timestamp_millis())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
