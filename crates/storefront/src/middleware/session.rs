//! Shopper sessions, stored in `tower_sessions.session`.
//!
//! `SameSite=Lax` so the session survives arriving from an email link or a
//! payment redirect.

use std::time::Duration;

use sqlx::PgPool;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

pub const SESSION_COOKIE_NAME: &str = "sapa_session";

/// Idle time before a session (and its cart and tokens) is forgotten.
pub const SESSION_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Session layer over the `PostgreSQL` store created by
/// `sapa migrate storefront`.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    session_layer(PostgresStore::new(pool.clone()), config.is_secure())
}

/// Session layer over any store; tests use `MemoryStore`.
#[must_use]
pub fn session_layer<S: SessionStore + Clone>(store: S, secure: bool) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(idle_expiry()))
        .with_secure(secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

fn idle_expiry() -> tower_sessions::cookie::time::Duration {
    let secs = i64::try_from(SESSION_EXPIRY.as_secs()).unwrap_or(i64::MAX);
    tower_sessions::cookie::time::Duration::seconds(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_expiry_is_a_week() {
        assert_eq!(idle_expiry().whole_days(), 7);
    }
}
