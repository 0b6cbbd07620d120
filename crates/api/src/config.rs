//! Client configuration.

use std::time::Duration;

use crate::ApiError;

/// Settings for [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the commerce API, e.g. `https://api.sapa.vn/api`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Time-to-live for cached catalog reads.
    pub cache_ttl: Duration,
    /// Maximum number of cached responses.
    pub cache_capacity: u64,
}

impl ApiConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
    pub const DEFAULT_CACHE_CAPACITY: u64 = 1000;

    /// Validate the base URL and apply defaults.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidBaseUrl` unless the URL parses and uses
    /// `http` or `https`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let parsed = url::Url::parse(base_url.trim())
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl(format!(
                "{base_url}: scheme must be http or https"
            )));
        }

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
            cache_ttl: Self::DEFAULT_CACHE_TTL,
            cache_capacity: Self::DEFAULT_CACHE_CAPACITY,
        })
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_strips_trailing_slash() {
        let config = ApiConfig::new("http://localhost:8080/api/").unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_new_rejects_bad_urls() {
        assert!(ApiConfig::new("not a url").is_err());
        assert!(ApiConfig::new("ftp://files.sapa.vn").is_err());
    }
}
