//! Application state shared across handlers.

use std::sync::Arc;

use sapa_api::ApiClient;
use sapa_core::Locale;
use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::EmailService;

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    api: ApiClient,
    email: EmailService,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool, api: ApiClient, email: EmailService) -> Self {
        let api = api.with_locale(config.locale);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                api,
                email,
            }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the session-store connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The shared API client, speaking the console locale.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Locale for money and dates.
    #[must_use]
    pub fn locale(&self) -> Locale {
        self.inner.config.locale
    }
}
