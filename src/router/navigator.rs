//! Current location and pending redirects
//!
//! Components that cannot navigate themselves (the auth manager on logout)
//! record a redirect here; the [`Router`](super::Router) applies it on the
//! next [`follow_pending`](super::Router::follow_pending).

use std::sync::{Mutex, PoisonError};

use super::routes::HOME_PATH;

#[derive(Debug)]
struct NavState {
    current: String,
    pending: Option<String>,
}

/// Shared navigation state.
#[derive(Debug)]
pub struct Navigator {
    state: Mutex<NavState>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    /// Starts at `/` with nothing pending.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NavState {
                current: HOME_PATH.to_string(),
                pending: None,
            }),
        }
    }

    /// Path of the route last entered.
    pub fn current(&self) -> String {
        self.lock().current.clone()
    }

    /// Records that `path` was entered.
    pub fn set_current(&self, path: &str) {
        self.lock().current = path.to_string();
    }

    /// Requests a redirect. A later request replaces an earlier one.
    pub fn redirect_to(&self, path: &str) {
        tracing::debug!(to = path, "Redirect requested");
        self.lock().pending = Some(path.to_string());
    }

    /// Pending redirect, without consuming it.
    pub fn pending(&self) -> Option<String> {
        self.lock().pending.clone()
    }

    /// Consumes the pending redirect.
    pub fn take_pending(&self) -> Option<String> {
        self.lock().pending.take()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NavState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
