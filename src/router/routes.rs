//! Static route table and path matching
//!
//! Patterns use three segment kinds: literals (`sessions`), named params
//! (`:id`) and a trailing catch-all (`:pathMatch(.*)*`). When several
//! routes match, the one with no catch-all and the fewest params wins;
//! remaining ties go to table order. This makes `/about` resolve to the
//! About view even though it is declared after the catch-all.

use std::collections::BTreeMap;

use serde::Serialize;

/// Path of the login view; the guard redirects here.
pub const LOGIN_PATH: &str = "/login";

/// Path of the home view.
pub const HOME_PATH: &str = "/";

/// The view component a route renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Home,
    MovieDetails,
    Sessions,
    Basket,
    Login,
    Register,
    PaymentSuccess,
    PaymentCancel,
    NotFound,
    About,
}

/// Per-route metadata consulted by the guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteMeta {
    /// The route may only be entered while an access token is held.
    pub requires_auth: bool,
}

/// A static route definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteDescriptor {
    /// Pattern, e.g. `/movies/:id`.
    pub path: &'static str,
    /// Route name.
    pub name: &'static str,
    /// View rendered for this route.
    pub view: View,
    /// Whether path params are handed to the view as props.
    pub props: bool,
    /// Guard metadata.
    pub meta: RouteMeta,
}

const fn route(
    path: &'static str,
    name: &'static str,
    view: View,
    props: bool,
    requires_auth: bool,
) -> RouteDescriptor {
    RouteDescriptor {
        path,
        name,
        view,
        props,
        meta: RouteMeta { requires_auth },
    }
}

static ROUTES: [RouteDescriptor; 10] = [
    route("/", "home", View::Home, false, false),
    route("/movies/:id", "movieDetails", View::MovieDetails, true, false),
    route("/sessions", "sessions", View::Sessions, true, true),
    route("/basket", "basket", View::Basket, true, true),
    route("/login", "login", View::Login, false, false),
    route("/register", "register", View::Register, false, false),
    route("/payment/success", "paymentSuccess", View::PaymentSuccess, true, false),
    route("/payment/cancel", "paymentCancel", View::PaymentCancel, true, false),
    route("/:pathMatch(.*)*", "notFound", View::NotFound, false, false),
    route("/about", "About", View::About, false, false),
];

/// The application's route table, in declaration order.
pub fn route_table() -> &'static [RouteDescriptor] {
    &ROUTES
}

/// A resolved route with its captured params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteMatch {
    /// The matched route.
    pub route: &'static RouteDescriptor,
    /// Normalized path that was matched (no query, no trailing slash).
    pub path: String,
    /// Captured params by name. A catch-all captures the remaining
    /// segments joined with `/`.
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Param(&'a str),
    CatchAll(&'a str),
}

fn parse_pattern(pattern: &str) -> Vec<Segment<'_>> {
    split_path(pattern)
        .map(|seg| match seg.strip_prefix(':') {
            Some(rest) => match rest.find('(') {
                Some(idx) if rest.ends_with('*') => Segment::CatchAll(&rest[..idx]),
                _ => Segment::Param(rest),
            },
            None => Segment::Literal(seg),
        })
        .collect()
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Strips query string and fragment, collapses empty segments, and returns
/// the canonical `/a/b` form.
pub fn normalize_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let segments: Vec<&str> = split_path(&path[..end]).collect();
    format!("/{}", segments.join("/"))
}

/// Lower ranks win: `(uses catch-all, param count)`.
type Rank = (bool, usize);

fn match_pattern(pattern: &str, segments: &[&str]) -> Option<(Rank, BTreeMap<String, String>)> {
    let parsed = parse_pattern(pattern);
    let mut params = BTreeMap::new();
    let mut param_count = 0;

    for (idx, seg) in parsed.iter().enumerate() {
        match *seg {
            Segment::CatchAll(name) => {
                params.insert(name.to_string(), segments.get(idx..)?.join("/"));
                return Some(((true, param_count), params));
            }
            Segment::Literal(lit) => {
                if segments.get(idx) != Some(&lit) {
                    return None;
                }
            }
            Segment::Param(name) => {
                let value = segments.get(idx)?;
                params.insert(name.to_string(), (*value).to_string());
                param_count += 1;
            }
        }
    }

    if parsed.len() == segments.len() {
        Some(((false, param_count), params))
    } else {
        None
    }
}

/// Resolves `path` against `routes`, returning the best-ranked match.
pub fn resolve_in(routes: &'static [RouteDescriptor], path: &str) -> Option<RouteMatch> {
    let normalized = normalize_path(path);
    let segments: Vec<&str> = split_path(&normalized).collect();

    routes
        .iter()
        .filter_map(|route| {
            match_pattern(route.path, &segments).map(|(rank, params)| (rank, route, params))
        })
        // min_by_key keeps the first of equal minima, preserving table order.
        .min_by_key(|(rank, _, _)| *rank)
        .map(|(_, route, params)| RouteMatch {
            route,
            path: normalized.clone(),
            params,
        })
}
