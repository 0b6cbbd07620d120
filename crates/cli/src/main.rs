//! Sapa CLI - Session-store migrations and API checks.
//!
//! # Usage
//!
//! ```bash
//! # Create the storefront session table
//! sapa migrate storefront
//!
//! # Create the admin session table
//! sapa migrate admin
//!
//! # Both databases
//! sapa migrate all
//!
//! # Check that the commerce API answers
//! sapa api ping
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create session tables
//! - `api ping` - Fetch `/settings` from `API_BASE_URL`

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sapa")]
#[command(author, version, about = "Sapa Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run session-store migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Talk to the commerce API
    Api {
        #[command(subcommand)]
        action: ApiAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Storefront session table
    Storefront,
    /// Admin session table
    Admin,
    /// Both session tables
    All,
}

#[derive(Subcommand)]
enum ApiAction {
    /// Fetch store settings and report the outcome
    Ping,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Storefront => commands::migrate::storefront().await?,
            MigrateTarget::Admin => commands::migrate::admin().await?,
            MigrateTarget::All => {
                commands::migrate::storefront().await?;
                commands::migrate::admin().await?;
            }
        },
        Commands::Api { action } => match action {
            ApiAction::Ping => commands::api::ping().await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_migrate_all() {
        let cli = Cli::try_parse_from(["sapa", "migrate", "all"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Migrate {
                target: MigrateTarget::All
            })
        ));
    }

    #[test]
    fn test_rejects_unknown_target() {
        assert!(Cli::try_parse_from(["sapa", "migrate", "warehouse"]).is_err());
    }
}
