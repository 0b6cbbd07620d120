//! Handler state.

use std::sync::Arc;

use sapa_api::{ApiClient, ApiError, DEFAULT_REFRESH_SKEW};
use sapa_core::Locale;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::middleware::session::SESSION_EXPIRY;
use crate::services::TokenKeeper;

/// Everything a request handler reaches for.
///
/// `PgPool` and `ApiClient` are handles already, so cloning the state
/// costs three reference-count bumps.
#[derive(Clone)]
pub struct AppState {
    config: Arc<StorefrontConfig>,
    pool: PgPool,
    api: ApiClient,
    tokens: Arc<TokenKeeper>,
}

impl AppState {
    /// Build the API client and the token keeper around it.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.api)?;
        let tokens = TokenKeeper::new(api.clone(), DEFAULT_REFRESH_SKEW, SESSION_EXPIRY);

        Ok(Self {
            config: Arc::new(config),
            pool,
            api,
            tokens: Arc::new(tokens),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    /// Session-store pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// API client sending `Accept-Language: locale`. Shares the connection
    /// pool and cache with every other locale.
    #[must_use]
    pub fn api(&self, locale: Locale) -> ApiClient {
        self.api.with_locale(locale)
    }

    /// Scheduled token refresh, one entry per signed-in session.
    #[must_use]
    pub const fn tokens(&self) -> &Arc<TokenKeeper> {
        &self.tokens
    }
}
