//! Session-store database for the admin console.
//!
//! The console keeps no domain data locally. Its only table is
//! [`SESSION_TABLE`], created by `sapa migrate admin`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Qualified name of the session table.
pub const SESSION_TABLE: &str = "admin.session";

/// Create the pool; a handful of operators never need more than five.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// `true` once the database answers and the session table exists.
pub async fn is_ready(pool: &PgPool) -> bool {
    match sqlx::query_scalar::<_, bool>("SELECT to_regclass($1::text) IS NOT NULL")
        .bind(SESSION_TABLE)
        .fetch_one(pool)
        .await
    {
        Ok(ready) => {
            if !ready {
                tracing::warn!(table = SESSION_TABLE, "Session table missing; run `sapa migrate admin`");
            }
            ready
        }
        Err(e) => {
            tracing::warn!(error = %e, "Session database unreachable");
            false
        }
    }
}
