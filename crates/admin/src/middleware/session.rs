//! Console sessions.
//!
//! Stricter than the storefront: `SameSite=Strict` and a one-day idle
//! expiry. Rows live in `admin.session` so the console can share a
//! database with the storefront without sharing its session table.

use sqlx::PgPool;
use tower_sessions::cookie::{SameSite, time::Duration};
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AdminConfig;

pub const SESSION_COOKIE_NAME: &str = "sapa_admin_session";

/// Schema holding the admin session table.
pub const SESSION_SCHEMA: &str = "admin";
const SESSION_TABLE_NAME: &str = "session";

/// Operators are signed out after a day without requests.
const IDLE_EXPIRY: Duration = Duration::days(1);

/// The store `sapa-admin` serves from and `sapa migrate admin` creates.
///
/// # Errors
///
/// Returns the store's message if the schema or table name is rejected.
pub fn session_store(pool: PgPool) -> Result<PostgresStore, String> {
    PostgresStore::new(pool)
        .with_schema_name(SESSION_SCHEMA)?
        .with_table_name(SESSION_TABLE_NAME)
}

/// Session layer over the `PostgreSQL` store.
///
/// # Errors
///
/// See [`session_store`].
pub fn create_session_layer(
    pool: &PgPool,
    config: &AdminConfig,
) -> Result<SessionManagerLayer<PostgresStore>, String> {
    Ok(session_layer(session_store(pool.clone())?, config.is_secure()))
}

/// Session layer over any store; tests use `MemoryStore`.
#[must_use]
pub fn session_layer<S: SessionStore + Clone>(store: S, secure: bool) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(IDLE_EXPIRY))
        .with_secure(secure)
        .with_same_site(SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
