//! Command-line interface definition for CineArc
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for authentication, API access, and routing.

use clap::{Parser, Subcommand};

/// CineArc - movie-ticketing client
///
/// Log in to the CineArc backend, keep the session fresh, and call the API
/// with automatic token renewal.
#[derive(Parser, Debug, Clone)]
#[command(name = "cinearc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Override the backend API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Keep the session in memory only (nothing is read or persisted)
    #[arg(long)]
    pub ephemeral: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for CineArc
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in and persist the session
    Login {
        /// Account name
        #[arg(short, long)]
        username: String,

        /// Account password
        #[arg(short, long, env = "CINEARC_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a new account
    Register {
        /// Account name
        #[arg(short, long)]
        username: String,

        /// Contact email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "CINEARC_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Clear the persisted session
    Logout,

    /// Fetch and show the current user
    Whoami,

    /// Show the local session state without contacting the backend
    Status {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Call an API endpoint with the session's credentials
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        #[arg(default_value = "GET")]
        method: String,

        /// Path relative to the API base, e.g. /sessions/
        path: String,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query", value_name = "KEY=VALUE")]
        query: Vec<String>,
    },

    /// Resolve a client route through the navigation guard
    Navigate {
        /// Route path, e.g. /basket
        path: String,
    },

    /// List the client route table
    Routes {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from the process environment
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
