//! Route table listing and guarded navigation

use colored::Colorize;
use prettytable::{format, row, Table};

use crate::context::SessionContext;
use crate::error::Result;
use crate::router::routes::{route_table, LOGIN_PATH};

/// Prints the route table.
pub fn list_routes(json: bool) -> Result<()> {
    let routes = route_table();

    if json {
        println!("{}", serde_json::to_string_pretty(routes)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["Path".bold(), "Name".bold(), "View".bold(), "Auth".bold()]);

    for route in routes {
        let auth = if route.meta.requires_auth {
            "required".yellow()
        } else {
            "-".normal()
        };
        table.add_row(row![route.path.cyan(), route.name, format!("{:?}", route.view), auth]);
    }

    println!("\nRoutes:");
    table.printstd();
    println!();
    Ok(())
}

/// Navigates to `path` and reports where the guard let the session land.
pub fn navigate(ctx: &SessionContext, path: &str) -> Result<()> {
    let outcome = ctx.router.navigate(path)?;

    if outcome.was_redirected() {
        println!(
            "{} {} {}, redirected to {}",
            "→".yellow(),
            outcome.requested,
            redirect_reason(&outcome.entered.path),
            outcome.entered.path.cyan()
        );
    }

    println!(
        "Entered {} ({:?})",
        outcome.entered.route.name.bold(),
        outcome.entered.route.view
    );
    for (name, value) in &outcome.entered.params {
        println!("  {name} = {value}");
    }
    Ok(())
}

/// Why the guard moved the session to `landed`.
fn redirect_reason(landed: &str) -> &'static str {
    if landed == LOGIN_PATH {
        "requires login"
    } else {
        "is only for signed-out users"
    }
}
