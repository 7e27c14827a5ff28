//! Navigation guard
//!
//! Runs before every route transition. The decision depends only on the
//! target route and whether an access token is present; token expiry is
//! not inspected here (the startup check and the API interceptor own that).

use serde::Serialize;

use super::routes::{RouteDescriptor, HOME_PATH, LOGIN_PATH};

/// Outcome of the guard for one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "to", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Enter the target route unchanged.
    Proceed,
    /// Navigate to the given path instead.
    Redirect(&'static str),
}

/// Decides whether a transition to `target` may proceed.
///
/// - protected route without a token → redirect to `/login`
/// - `/login` while holding a token → redirect to `/`
/// - anything else → proceed
///
/// # Examples
///
/// ```
/// use cinearc::router::guard::{decide, GuardDecision};
/// use cinearc::router::routes::route_table;
///
/// let sessions = route_table().iter().find(|r| r.path == "/sessions").unwrap();
/// assert_eq!(decide(sessions, false), GuardDecision::Redirect("/login"));
/// assert_eq!(decide(sessions, true), GuardDecision::Proceed);
/// ```
pub fn decide(target: &RouteDescriptor, is_authenticated: bool) -> GuardDecision {
    if target.meta.requires_auth && !is_authenticated {
        GuardDecision::Redirect(LOGIN_PATH)
    } else if target.path == LOGIN_PATH && is_authenticated {
        GuardDecision::Redirect(HOME_PATH)
    } else {
        GuardDecision::Proceed
    }
}
