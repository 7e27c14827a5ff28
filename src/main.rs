//! CineArc - movie-ticketing client CLI
//!
#![doc = "CineArc - movie-ticketing client CLI"]
#![doc = "Main entry point for the CineArc command-line client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cinearc::cli::{Cli, Commands};
use cinearc::commands;
use cinearc::config::Config;
use cinearc::context::SessionContext;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Routes { json } => commands::routes::list_routes(json)?,
        command => {
            let ctx = SessionContext::bootstrap(config)?;
            commands::run(&ctx, command).await?;
        }
    }

    Ok(())
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "cinearc=debug" } else { "cinearc=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
