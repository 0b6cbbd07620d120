//! Session-store database for the storefront.
//!
//! The storefront keeps no domain data locally; the only table is
//! [`SESSION_TABLE`], created by `sapa migrate storefront`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Qualified name of the session table.
pub const SESSION_TABLE: &str = "tower_sessions.session";

/// Create the pool. Session reads happen on most page views, so it is
/// sized for the request rate rather than for operators.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(10 * 60))
        .connect(database_url.expose_secret())
        .await
}

/// `true` once the database answers and the session table exists.
pub async fn is_ready(pool: &PgPool) -> bool {
    let exists = sqlx::query_scalar::<_, bool>("SELECT to_regclass($1::text) IS NOT NULL")
        .bind(SESSION_TABLE)
        .fetch_one(pool)
        .await;
    match exists {
        Ok(true) => true,
        Ok(false) => {
            tracing::warn!(table = SESSION_TABLE, "Session table missing; run `sapa migrate storefront`");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "Session database unreachable");
            false
        }
    }
}
