//! In-memory session with durable token mirroring
//!
//! [`TokenStore`] owns the process's [`Session`]. Every token write is
//! mirrored synchronously into a [`SessionStorage`] backend under the
//! `token` / `refresh_token` keys; [`TokenStore::clear`] removes both keys.
//!
//! The in-memory session is authoritative for the running process: if the
//! storage backend rejects a write, the failure is logged and the new value
//! is still visible to readers. Concurrent writers get last-write-wins.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::auth::storage::{SessionStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The authenticated user as reported by the backend.
///
/// Only `id` and `username` are required; anything else returned by
/// `GET /auth/user/` is preserved verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Backend user identifier.
    pub id: u64,

    /// Login name.
    pub username: String,

    /// Additional fields from the user endpoint (email, names, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// Builds a user with no extra fields.
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Snapshot of the client's authentication state.
///
/// Empty strings mean "no token". `user` is only populated while an access
/// token is held.
///
/// # Examples
///
/// ```
/// use cinearc::auth::token_store::Session;
///
/// let session = Session::default();
/// assert!(!session.is_authenticated());
/// assert!(session.user.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer credential presented on API calls.
    pub access_token: String,

    /// Credential exchanged for a new access token.
    pub refresh_token: String,

    /// Current user, when known.
    pub user: Option<User>,
}

impl Session {
    /// Returns `true` when an access token is held.
    ///
    /// This is a presence check only; expiry is not inspected.
    pub fn is_authenticated(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Returns `true` when a refresh token is held.
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TokenStore
// ---------------------------------------------------------------------------

/// Process-wide holder of the [`Session`].
///
/// Constructed once per process (see
/// [`SessionContext`](crate::context::SessionContext)) and shared through an
/// `Arc`. Locks are held only for the duration of a field copy, never across
/// an `.await`.
pub struct TokenStore {
    session: RwLock<Session>,
    storage: Arc<dyn SessionStorage>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.get();
        f.debug_struct("TokenStore")
            .field("authenticated", &session.is_authenticated())
            .field("has_refresh_token", &session.has_refresh_token())
            .field("user", &session.user.as_ref().map(|u| &u.username))
            .finish()
    }
}

impl TokenStore {
    /// Creates an empty store that mirrors writes into `storage`.
    ///
    /// Nothing is read from `storage`; use [`rehydrate`](Self::rehydrate) to
    /// pick up a previously persisted session.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            session: RwLock::new(Session::default()),
            storage,
        }
    }

    /// Creates a store whose tokens are read back from `storage`.
    ///
    /// Missing keys yield empty tokens. The user is never persisted and
    /// starts as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be read.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use cinearc::auth::storage::{MemoryStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
    /// use cinearc::auth::token_store::TokenStore;
    ///
    /// let storage = Arc::new(MemoryStorage::with_entries([
    ///     (ACCESS_TOKEN_KEY, "A1"),
    ///     (REFRESH_TOKEN_KEY, "R1"),
    /// ]));
    /// let store = TokenStore::rehydrate(storage).unwrap();
    /// assert_eq!(store.get().access_token, "A1");
    /// assert_eq!(store.get().refresh_token, "R1");
    /// ```
    pub fn rehydrate(storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let access_token = storage.get(ACCESS_TOKEN_KEY)?.unwrap_or_default();
        let refresh_token = storage.get(REFRESH_TOKEN_KEY)?.unwrap_or_default();
        tracing::debug!(
            has_access = !access_token.is_empty(),
            has_refresh = !refresh_token.is_empty(),
            "Rehydrated session from storage"
        );
        Ok(Self {
            session: RwLock::new(Session {
                access_token,
                refresh_token,
                user: None,
            }),
            storage,
        })
    }

    /// Returns a snapshot of the current session.
    pub fn get(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current access token, or `None` when empty.
    pub fn access_token(&self) -> Option<String> {
        let session = self.session.read().unwrap_or_else(PoisonError::into_inner);
        non_empty(&session.access_token)
    }

    /// Current refresh token, or `None` when empty.
    pub fn refresh_token(&self) -> Option<String> {
        let session = self.session.read().unwrap_or_else(PoisonError::into_inner);
        non_empty(&session.refresh_token)
    }

    /// Returns `true` when an access token is held.
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Replaces the access token and mirrors it to storage.
    ///
    /// An empty token removes the persisted key and drops the user.
    pub fn set_access(&self, token: &str) {
        {
            let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
            session.access_token = token.to_string();
            if token.is_empty() {
                session.user = None;
            }
        }
        self.mirror(ACCESS_TOKEN_KEY, token);
    }

    /// Replaces the refresh token and mirrors it to storage.
    ///
    /// An empty token removes the persisted key.
    pub fn set_refresh(&self, token: &str) {
        {
            let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
            session.refresh_token = token.to_string();
        }
        self.mirror(REFRESH_TOKEN_KEY, token);
    }

    /// Replaces the current user. Not persisted.
    pub fn set_user(&self, user: Option<User>) {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        session.user = user;
    }

    /// Commits the outcome of a refresh that was sent with `sent_refresh`.
    ///
    /// The commit only happens if the session still holds `sent_refresh`;
    /// a logout or a new login while the refresh was in flight wins, and
    /// `false` is returned. A non-empty `rotated` refresh token replaces
    /// the old one.
    pub fn commit_refresh(&self, sent_refresh: &str, access: &str, rotated: Option<&str>) -> bool {
        let rotated = rotated.filter(|r| !r.is_empty());
        {
            let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
            if session.refresh_token.is_empty() || session.refresh_token != sent_refresh {
                return false;
            }
            session.access_token = access.to_string();
            if let Some(rotated) = rotated {
                session.refresh_token = rotated.to_string();
            }
        }
        self.mirror(ACCESS_TOKEN_KEY, access);
        if let Some(rotated) = rotated {
            self.mirror(REFRESH_TOKEN_KEY, rotated);
        }
        true
    }

    /// Empties the session and removes both persisted keys.
    pub fn clear(&self) {
        {
            let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
            *session = Session::default();
        }
        self.mirror(ACCESS_TOKEN_KEY, "");
        self.mirror(REFRESH_TOKEN_KEY, "");
    }

    fn mirror(&self, key: &str, value: &str) {
        let outcome = if value.is_empty() {
            self.storage.remove(key)
        } else {
            self.storage.set(key, value)
        };
        if let Err(e) = outcome {
            tracing::warn!(key, error = %e, "Failed to mirror session to storage");
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
