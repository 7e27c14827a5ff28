//! Client-side routing
//!
//! - [`routes`]    -- static route table and path matching
//! - [`guard`]     -- authorization decision run before each transition
//! - [`navigator`] -- current location and pending redirects
//!
//! [`Router`] ties them together: it resolves a path, asks the guard, and
//! follows redirects until a route is entered.

pub mod guard;
pub mod navigator;
pub mod routes;

use std::sync::Arc;

use serde::Serialize;

use crate::auth::token_store::TokenStore;
use crate::error::{CinearcError, Result};

use self::guard::{decide, GuardDecision};
use self::navigator::Navigator;
use self::routes::{resolve_in, route_table, RouteDescriptor, RouteMatch};

/// Upper bound on guard redirects followed for one navigation.
const MAX_REDIRECTS: usize = 5;

/// Result of a completed navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationOutcome {
    /// Path originally requested.
    pub requested: String,
    /// Paths the guard redirected through, in order.
    pub redirects: Vec<String>,
    /// Route finally entered.
    pub entered: RouteMatch,
}

impl NavigationOutcome {
    /// Returns `true` when the guard changed the destination.
    pub fn was_redirected(&self) -> bool {
        !self.redirects.is_empty()
    }
}

/// Resolves paths and runs the navigation guard.
#[derive(Debug, Clone)]
pub struct Router {
    routes: &'static [RouteDescriptor],
    store: Arc<TokenStore>,
    navigator: Arc<Navigator>,
}

impl Router {
    /// Creates a router over the application's route table.
    pub fn new(store: Arc<TokenStore>, navigator: Arc<Navigator>) -> Self {
        Self {
            routes: route_table(),
            store,
            navigator,
        }
    }

    /// The static route table.
    pub fn routes(&self) -> &'static [RouteDescriptor] {
        self.routes
    }

    /// Resolves `path` without running the guard.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        resolve_in(self.routes, path)
    }

    /// Navigates to `path`, following guard redirects.
    ///
    /// On success the navigator's current location is updated to the route
    /// entered.
    ///
    /// # Errors
    ///
    /// Returns [`CinearcError::RouteNotFound`] if a path matches no route and
    /// [`CinearcError::RedirectLoop`] if the guard keeps redirecting.
    pub fn navigate(&self, path: &str) -> Result<NavigationOutcome> {
        let mut redirects = Vec::new();
        let mut target = path.to_string();

        for _ in 0..=MAX_REDIRECTS {
            let matched = self
                .resolve(&target)
                .ok_or_else(|| CinearcError::RouteNotFound(target.clone()))?;

            match decide(matched.route, self.store.is_authenticated()) {
                GuardDecision::Proceed => {
                    tracing::debug!(path = %matched.path, route = matched.route.name, "Entering route");
                    self.navigator.set_current(&matched.path);
                    return Ok(NavigationOutcome {
                        requested: path.to_string(),
                        redirects,
                        entered: matched,
                    });
                }
                GuardDecision::Redirect(to) => {
                    tracing::info!(from = %matched.path, to, "Navigation guard redirected");
                    redirects.push(to.to_string());
                    target = to.to_string();
                }
            }
        }

        Err(CinearcError::RedirectLoop(path.to_string()).into())
    }

    /// Applies a redirect recorded on the navigator (e.g. by logout).
    ///
    /// Returns `Ok(None)` when nothing is pending.
    pub fn follow_pending(&self) -> Result<Option<NavigationOutcome>> {
        match self.navigator.take_pending() {
            Some(path) => self.navigate(&path).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryStorage;
    use crate::router::routes::View;

    fn make_router() -> (Router, Arc<TokenStore>, Arc<Navigator>) {
        let store = Arc::new(TokenStore::new(Arc::new(MemoryStorage::new())));
        let navigator = Arc::new(Navigator::new());
        (
            Router::new(Arc::clone(&store), Arc::clone(&navigator)),
            store,
            navigator,
        )
    }

    #[test]
    fn test_navigate_public_route_without_redirect() {
        let (router, _, navigator) = make_router();
        let outcome = router.navigate("/movies/9").unwrap();
        assert!(!outcome.was_redirected());
        assert_eq!(outcome.entered.route.view, View::MovieDetails);
        assert_eq!(navigator.current(), "/movies/9");
    }

    #[test]
    fn test_navigate_protected_route_anonymous_lands_on_login() {
        let (router, _, navigator) = make_router();
        let outcome = router.navigate("/sessions").unwrap();
        assert_eq!(outcome.redirects, vec!["/login".to_string()]);
        assert_eq!(outcome.entered.route.view, View::Login);
        assert_eq!(navigator.current(), "/login");
    }

    #[test]
    fn test_navigate_protected_route_authenticated() {
        let (router, store, _) = make_router();
        store.set_access("A1");
        let outcome = router.navigate("/basket").unwrap();
        assert!(!outcome.was_redirected());
        assert_eq!(outcome.entered.route.view, View::Basket);
    }

    #[test]
    fn test_navigate_login_authenticated_lands_home() {
        let (router, store, _) = make_router();
        store.set_access("A1");
        let outcome = router.navigate("/login").unwrap();
        assert_eq!(outcome.redirects, vec!["/".to_string()]);
        assert_eq!(outcome.entered.route.view, View::Home);
    }

    #[test]
    fn test_follow_pending_without_redirect_is_none() {
        let (router, _, _) = make_router();
        assert!(router.follow_pending().unwrap().is_none());
    }

    #[test]
    fn test_follow_pending_applies_and_consumes_redirect() {
        let (router, _, navigator) = make_router();
        navigator.redirect_to("/login");
        let outcome = router.follow_pending().unwrap().expect("pending redirect");
        assert_eq!(outcome.entered.route.view, View::Login);
        assert!(navigator.pending().is_none());
    }
}
