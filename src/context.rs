//! Per-process session context
//!
//! [`SessionContext`] builds the token store, auth manager, API client and
//! router exactly once and hands them out explicitly. Nothing in the crate
//! reaches for global state; everything that needs the session receives it
//! from here.

use std::sync::Arc;

use crate::api::client::ApiClient;
use crate::api::endpoints::{build_http_client, Endpoints};
use crate::auth::manager::AuthManager;
use crate::auth::storage::{open_storage, SessionStorage};
use crate::auth::token_store::TokenStore;
use crate::config::Config;
use crate::error::Result;
use crate::router::navigator::Navigator;
use crate::router::Router;

/// Everything that shares the session, wired together.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Effective configuration.
    pub config: Config,
    /// The session.
    pub store: Arc<TokenStore>,
    /// Current location and pending redirects.
    pub navigator: Arc<Navigator>,
    /// Token lifecycle operations.
    pub auth: AuthManager,
    /// Authenticated API access.
    pub api: ApiClient,
    /// Route resolution and guarding.
    pub router: Router,
    /// Whether the stored session was logged out by the startup expiry
    /// check.
    pub expired_at_startup: bool,
}

impl SessionContext {
    /// Opens the configured storage backend and builds the context.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be opened or read, or the API
    /// URL is invalid.
    pub fn bootstrap(config: Config) -> Result<Self> {
        let storage = open_storage(&config.storage)?;
        Self::with_storage(config, storage)
    }

    /// Builds the context over an already opened storage backend.
    ///
    /// The session is rehydrated from `storage`, then the startup expiry
    /// check runs: an expired or undecodable access token is logged out
    /// (leaving a pending redirect to `/login`) before the context is
    /// returned.
    pub fn with_storage(config: Config, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let store = Arc::new(TokenStore::rehydrate(storage)?);
        let navigator = Arc::new(Navigator::new());
        let http = build_http_client(&config.api)?;
        let endpoints = Endpoints::new(&config.api.url)?;

        let auth = AuthManager::new(
            http.clone(),
            endpoints.clone(),
            Arc::clone(&store),
            Arc::clone(&navigator),
        );
        let api = ApiClient::new(http, endpoints, Arc::clone(&store), auth.clone());
        let router = Router::new(Arc::clone(&store), Arc::clone(&navigator));

        let expired_at_startup = auth.check_startup_expiry();
        if expired_at_startup {
            tracing::info!("Session expired while the client was not running");
        }

        Ok(Self {
            config,
            store,
            navigator,
            auth,
            api,
            router,
            expired_at_startup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::{MemoryStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
    use crate::config::StorageBackend;
    use base64::Engine as _;

    fn token_with_exp(exp: i64) -> String {
        let body = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(format!(r#"{{"exp":{exp}}}"#));
        format!("h.{body}.s")
    }

    #[test]
    fn test_with_storage_rehydrates_valid_session() {
        let access = token_with_exp(chrono::Utc::now().timestamp() + 600);
        let storage = Arc::new(MemoryStorage::with_entries([
            (ACCESS_TOKEN_KEY, access.as_str()),
            (REFRESH_TOKEN_KEY, "R1"),
        ]));

        let ctx = SessionContext::with_storage(Config::default(), storage).unwrap();

        assert_eq!(ctx.store.access_token(), Some(access));
        assert!(ctx.navigator.pending().is_none());
        assert!(!ctx.expired_at_startup);
    }

    #[test]
    fn test_with_storage_clears_expired_session() {
        let storage = Arc::new(MemoryStorage::with_entries([
            (ACCESS_TOKEN_KEY, token_with_exp(1).as_str()),
            (REFRESH_TOKEN_KEY, "R1"),
        ]));

        let ctx = SessionContext::with_storage(Config::default(), storage.clone()).unwrap();

        assert!(!ctx.store.is_authenticated());
        assert!(storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
        assert!(storage.get(REFRESH_TOKEN_KEY).unwrap().is_none());
        assert_eq!(ctx.navigator.pending().as_deref(), Some("/login"));
        assert!(ctx.expired_at_startup);
    }

    #[test]
    fn test_bootstrap_memory_backend_starts_empty() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Memory;
        let ctx = SessionContext::bootstrap(config).unwrap();
        assert!(!ctx.store.is_authenticated());
        assert!(!ctx.expired_at_startup);
    }

    #[test]
    fn test_with_storage_rejects_invalid_api_url() {
        let mut config = Config::default();
        config.api.url = "not a url".to_string();
        assert!(SessionContext::with_storage(config, Arc::new(MemoryStorage::new())).is_err());
    }
}
