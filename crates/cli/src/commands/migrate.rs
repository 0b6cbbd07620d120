//! Session-store migrations.
//!
//! All domain data lives behind the REST API; the only tables the web
//! binaries need are their session tables.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for storefront
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string for admin
//! - `DATABASE_URL` - used by either target whose own variable is unset,
//!   matching what the web binaries read at startup

use sapa_admin::middleware::session::{SESSION_SCHEMA, session_store};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tower_sessions_sqlx_store::PostgresStore;

use super::CommandError;

const SHARED_DATABASE_URL: &str = "DATABASE_URL";

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `specific` if set, else `shared`; the error names the specific key.
fn pick_database_url(
    key: &'static str,
    specific: Option<String>,
    shared: Option<String>,
) -> Result<SecretString, CommandError> {
    non_empty(specific)
        .or_else(|| non_empty(shared))
        .map(SecretString::from)
        .ok_or(CommandError::MissingEnvVar(key))
}

fn database_url(key: &'static str) -> Result<SecretString, CommandError> {
    pick_database_url(
        key,
        std::env::var(key).ok(),
        std::env::var(SHARED_DATABASE_URL).ok(),
    )
}

/// Create `tower_sessions.session` in the storefront database.
///
/// # Errors
///
/// Returns an error if neither URL is set or the migration fails.
pub async fn storefront() -> Result<(), CommandError> {
    let database_url = database_url("STOREFRONT_DATABASE_URL")?;

    tracing::info!("Connecting to storefront database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Creating storefront session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Storefront migrations complete");
    Ok(())
}

/// Create `admin.session` in the admin database.
///
/// # Errors
///
/// Returns an error if neither URL is set or the migration fails.
pub async fn admin() -> Result<(), CommandError> {
    let database_url = database_url("ADMIN_DATABASE_URL")?;

    tracing::info!("Connecting to admin database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!(schema = SESSION_SCHEMA, "Creating admin session table...");
    session_store(pool)
        .map_err(CommandError::Store)?
        .migrate()
        .await?;

    tracing::info!("Admin migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn test_specific_url_wins() {
        let picked = pick_database_url(
            "ADMIN_DATABASE_URL",
            url("postgres://admin"),
            url("postgres://shared"),
        )
        .unwrap();
        assert_eq!(picked.expose_secret(), "postgres://admin");
    }

    #[test]
    fn test_falls_back_to_shared_url() {
        let picked =
            pick_database_url("STOREFRONT_DATABASE_URL", url("  "), url("postgres://shared"))
                .unwrap();
        assert_eq!(picked.expose_secret(), "postgres://shared");
    }

    #[test]
    fn test_missing_names_specific_key() {
        let err = pick_database_url("ADMIN_DATABASE_URL", None, url("")).unwrap_err();
        assert!(matches!(err, CommandError::MissingEnvVar("ADMIN_DATABASE_URL")));
    }
}
