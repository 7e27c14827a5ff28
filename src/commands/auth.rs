//! Session commands: login, register, logout, whoami and status

use colored::Colorize;
use serde::Serialize;

use crate::auth::jwt;
use crate::auth::manager::{Credentials, Registration};
use crate::auth::token_store::Session;
use crate::context::SessionContext;
use crate::error::{CinearcError, Result};

/// Logs in and loads the user profile.
///
/// # Errors
///
/// Returns [`CinearcError::LoginRejected`] when the backend refuses the
/// credentials or cannot be reached.
pub async fn login(ctx: &SessionContext, username: String, password: String) -> Result<()> {
    let credentials = Credentials::new(username, password);
    if !ctx.auth.login(&credentials).await {
        return Err(CinearcError::LoginRejected(credentials.username).into());
    }

    ctx.auth.fetch_user().await;

    let session = ctx.store.get();
    let name = session
        .user
        .as_ref()
        .map(|u| u.username.as_str())
        .unwrap_or(credentials.username.as_str());
    println!("{} Logged in as {}", "✓".green(), name.cyan().bold());
    Ok(())
}

/// Creates an account without logging in.
pub async fn register(
    ctx: &SessionContext,
    username: String,
    email: String,
    password: String,
) -> Result<()> {
    let user = ctx
        .auth
        .register(&Registration {
            username,
            email,
            password,
        })
        .await?;

    println!(
        "{} Registered {} (id {})",
        "✓".green(),
        user.username.cyan().bold(),
        user.id
    );
    println!("Use {} to sign in.", "cinearc login -u <USERNAME>".cyan());
    Ok(())
}

/// Clears the session.
pub fn logout(ctx: &SessionContext) {
    let was_authenticated = ctx.store.is_authenticated();
    ctx.auth.logout();
    if was_authenticated {
        println!("{} Logged out", "✓".green());
    } else {
        println!("{}", "No active session.".yellow());
    }
}

/// Refreshes the user profile from the backend and prints it.
pub async fn whoami(ctx: &SessionContext) -> Result<()> {
    if !ctx.store.is_authenticated() {
        println!("{}", "Not logged in.".yellow());
        return Ok(());
    }

    ctx.auth.fetch_user().await;

    match ctx.store.get().user {
        Some(user) => {
            println!("Username: {}", user.username.cyan().bold());
            println!("User ID:  {}", user.id);
            for (key, value) in &user.extra {
                println!("{key}: {value}");
            }
        }
        None => println!("{}", "Logged in, but the user profile is unavailable.".yellow()),
    }
    Ok(())
}

/// Local view of the session, safe to print.
#[derive(Debug, Serialize)]
struct StatusReport {
    authenticated: bool,
    has_refresh_token: bool,
    username: Option<String>,
    user_id: Option<u64>,
    access_expires_at: Option<String>,
    access_expired: Option<bool>,
}

impl StatusReport {
    fn from_session(session: &Session) -> Self {
        let access = Some(session.access_token.as_str()).filter(|t| !t.is_empty());
        let claims = access.and_then(|t| jwt::decode_claims(t).ok());

        Self {
            authenticated: session.is_authenticated(),
            has_refresh_token: session.has_refresh_token(),
            username: session.user.as_ref().map(|u| u.username.clone()),
            user_id: session.user.as_ref().map(|u| u.id),
            access_expires_at: claims
                .as_ref()
                .and_then(|c| c.expires_at())
                .map(|t| t.to_rfc3339()),
            access_expired: access.map(jwt::is_expired),
        }
    }
}

/// Prints the locally held session state.
pub fn status(ctx: &SessionContext, json: bool) -> Result<()> {
    let report = StatusReport::from_session(&ctx.store.get());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if !report.authenticated {
        println!("Session: {}", "anonymous".yellow());
        return Ok(());
    }

    println!("Session: {}", "authenticated".green());
    if let Some(name) = &report.username {
        println!("User:    {}", name.cyan());
    }
    match (&report.access_expires_at, report.access_expired) {
        (Some(at), Some(true)) => println!("Access:  expired at {}", at.red()),
        (Some(at), _) => println!("Access:  valid until {at}"),
        _ => println!("Access:  {}", "expiry unknown".yellow()),
    }
    println!(
        "Refresh: {}",
        if report.has_refresh_token {
            "present".green()
        } else {
            "missing".red()
        }
    );
    Ok(())
}
