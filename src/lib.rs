//! CineArc - movie-ticketing client library
//!
//! This library provides the client-side authentication session for the
//! CineArc backend: token persistence, login and token refresh, an API
//! client that recovers from expired access tokens, and the route guard
//! that keeps anonymous users out of protected views.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: Token store, storage backends, JWT claims and the auth manager
//! - `api`: Endpoint URLs, response classification and the retrying client
//! - `router`: Route table, navigation guard and navigator
//! - `context`: Wires the above together around one shared session
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use cinearc::{Config, SessionContext};
//! use cinearc::api::ApiRequest;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::default();
//!     config.api.url = "http://localhost:8000/api".to_string();
//!     config.validate()?;
//!
//!     let ctx = SessionContext::bootstrap(config)?;
//!     let sessions = ctx.api.send(&ApiRequest::get("/sessions/")).await?;
//!     println!("{sessions}");
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod router;

// Re-export commonly used types
pub use api::{ApiClient, ApiRequest};
pub use auth::{AuthManager, Credentials, Session, TokenStore, User};
pub use config::Config;
pub use context::SessionContext;
pub use error::{CinearcError, Result};
pub use router::Router;
