//! Client-side authentication
//!
//! # Module Layout
//!
//! - [`jwt`]         -- unverified access token claims decoding
//! - [`manager`]     -- login, refresh, logout and startup expiry check
//! - [`storage`]     -- durable key/value backends for the tokens
//! - [`token_store`] -- in-memory session mirrored into storage

pub mod jwt;
pub mod manager;
pub mod storage;
pub mod token_store;

pub use manager::{AuthManager, Credentials, Registration};
pub use token_store::{Session, TokenStore, User};
