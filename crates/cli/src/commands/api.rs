//! REST API checks.
//!
//! # Environment Variables
//!
//! - `API_BASE_URL` - Base URL of the commerce API
//! - `API_TIMEOUT_SECS` - Request timeout (default 15)

use std::time::{Duration, Instant};

use sapa_api::{ApiClient, ApiConfig};

use super::{CommandError, require_env};

/// Fetch `/settings` and log what came back.
///
/// # Errors
///
/// Returns an error if the base URL is missing or invalid, or the
/// request fails.
pub async fn ping() -> Result<(), CommandError> {
    let base_url = require_env("API_BASE_URL")?;
    let timeout = std::env::var("API_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map_or(ApiConfig::DEFAULT_TIMEOUT, Duration::from_secs);

    let config = ApiConfig::new(&base_url)?.with_timeout(timeout);
    let client = ApiClient::new(&config)?;

    let started = Instant::now();
    match client.get_settings().await {
        Ok(settings) => {
            tracing::info!(
                base_url = %config.base_url,
                latency_ms = started.elapsed().as_millis(),
                store = %settings.store_name,
                currency = settings.currency.code(),
                locale = %settings.default_locale,
                "API is up"
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!(
                base_url = %config.base_url,
                latency_ms = started.elapsed().as_millis(),
                error = %err,
                "API ping failed"
            );
            Err(err.into())
        }
    }
}
