//! Backend API access
//!
//! - [`endpoints`] -- URL construction for the backend's REST contract
//! - [`response`]  -- non-2xx classification and JSON body reading
//! - [`client`]    -- bearer-authenticated client with refresh-and-retry

pub mod client;
pub mod endpoints;
pub mod response;

pub use client::{ApiClient, ApiRequest, Attempt};
pub use endpoints::Endpoints;
