/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three command modules:

- `auth`   -- login, registration, logout and session inspection
- `api`    -- authenticated requests against the backend
- `routes` -- route table listing and guarded navigation

Handlers receive a bootstrapped [`SessionContext`] and print to stdout;
diagnostics go through `tracing` on stderr.
*/

use colored::Colorize;

use crate::cli::Commands;
use crate::context::SessionContext;
use crate::error::Result;

pub mod api;
pub mod auth;
pub mod routes;

/// Runs a command that needs the session.
///
/// After the command completes, any redirect the session requested (for
/// example the `/login` redirect issued by a failed refresh) is followed.
/// It is reported only when a session actually ended along the way.
pub async fn run(ctx: &SessionContext, command: Commands) -> Result<()> {
    let had_session = ctx.expired_at_startup || ctx.store.is_authenticated();
    let outcome = match command {
        Commands::Login { username, password } => auth::login(ctx, username, password).await,
        Commands::Register {
            username,
            email,
            password,
        } => auth::register(ctx, username, email, password).await,
        Commands::Logout => {
            auth::logout(ctx);
            Ok(())
        }
        Commands::Whoami => auth::whoami(ctx).await,
        Commands::Status { json } => auth::status(ctx, json),
        Commands::Request {
            method,
            path,
            data,
            query,
        } => api::request(ctx, &method, &path, data.as_deref(), &query).await,
        Commands::Navigate { path } => routes::navigate(ctx, &path),
        Commands::Routes { json } => routes::list_routes(json),
    };

    let session_ended = had_session && !ctx.store.is_authenticated();
    report_pending_redirect(ctx, session_ended);
    outcome
}

fn report_pending_redirect(ctx: &SessionContext, session_ended: bool) {
    match ctx.router.follow_pending() {
        Ok(Some(nav)) if session_ended => {
            println!(
                "{} session ended, redirected to {}",
                "note:".yellow().bold(),
                nav.entered.path.cyan()
            );
        }
        Ok(Some(nav)) => tracing::debug!(to = %nav.entered.path, "Followed pending redirect"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to follow pending redirect"),
    }
}
