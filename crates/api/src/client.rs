//! The shared REST client.
//!
//! Every call goes through [`ApiClient::execute`], which attaches the
//! caller's bearer token and locale, decodes the `{"data", "message"}`
//! envelope, and on a `401` refreshes the tokens and replays the request
//! once.
//!
//! Refresh tokens are single-use. Refreshes presenting the same token are
//! coalesced into one call, and the renewed pair is handed to every caller
//! that presents that token within [`REFRESH_REUSE_WINDOW`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use sapa_core::Locale;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::auth::{AuthSession, TokenPair};
use crate::cache::CacheValue;
use crate::config::ApiConfig;
use crate::error::{ApiError, extract_message};

/// How long a renewed pair is handed out for the refresh token it replaced.
pub const REFRESH_REUSE_WINDOW: Duration = Duration::from_secs(30);

/// Upper bound on refresh tokens remembered at once.
const REFRESH_REUSE_CAPACITY: u64 = 10_000;

/// Response envelope used by every endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

/// A decoded response: the payload plus the API's human message, if any.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub message: Option<String>,
}

/// A request that can be sent more than once.
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    cookie: Option<String>,
}

impl ApiRequest {
    pub(crate) fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            cookie: None,
        }
    }

    pub(crate) fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub(crate) fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub(crate) fn query(mut self, pairs: &[(&str, String)]) -> Self {
        self.query
            .extend(pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())));
        self
    }

    /// Serialize the body up front so the request can be replayed.
    pub(crate) fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub(crate) fn cookie(mut self, cookie: String) -> Self {
        self.cookie = Some(cookie);
        self
    }
}

/// Client for the commerce REST API.
///
/// Cheap to clone. [`ApiClient::with_locale`] returns a handle that sends a
/// different `Accept-Language` while sharing the connection pool and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
    locale: Locale,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    cache: Cache<String, CacheValue>,
    /// Renewed pairs keyed by the refresh token they were issued for.
    refreshes: Cache<String, TokenPair>,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("sapa/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl)
            .build();

        let refreshes = Cache::builder()
            .max_capacity(REFRESH_REUSE_CAPACITY)
            .time_to_live(REFRESH_REUSE_WINDOW)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.base_url.clone(),
                cache,
                refreshes,
            }),
            locale: Locale::default(),
        })
    }

    /// A handle that sends `locale` as `Accept-Language`.
    #[must_use]
    pub fn with_locale(&self, locale: Locale) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            locale,
        }
    }

    #[must_use]
    pub const fn locale(&self) -> Locale {
        self.locale
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    // =========================================================================
    // Generic verbs
    // =========================================================================

    /// `GET path?query`, returning the envelope's `data`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or an
    /// undecodable body.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        auth: Option<&AuthSession>,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::get(path).query(query);
        Ok(self.execute(request, auth).await?.data)
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        auth: Option<&AuthSession>,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::post(path).json(body)?;
        Ok(self.execute(request, auth).await?.data)
    }

    /// `PATCH path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        auth: Option<&AuthSession>,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::new(Method::PATCH, path).json(body)?;
        Ok(self.execute(request, auth).await?.data)
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        auth: Option<&AuthSession>,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::new(Method::PUT, path).json(body)?;
        Ok(self.execute(request, auth).await?.data)
    }

    /// `DELETE path`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: Option<&AuthSession>,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::new(Method::DELETE, path);
        Ok(self.execute(request, auth).await?.data)
    }

    // =========================================================================
    // Request pipeline
    // =========================================================================

    /// Send a request, refreshing and replaying once on `401`.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        auth: Option<&AuthSession>,
    ) -> Result<ApiResponse<T>, ApiError> {
        let response = self.dispatch(&request, auth).await?;

        if response.status() == StatusCode::UNAUTHORIZED
            && let Some(auth) = auth
            && let Some(refresh_token) = auth.refresh_token()
        {
            debug!(path = %request.path, "Access token rejected, refreshing");
            let previous = auth.tokens();
            match self.refresh(&refresh_token).await {
                Ok(renewed) => auth.replace(renewed.inherit_refresh_token(&previous)),
                Err(e) => {
                    warn!(error = %e, "Token refresh failed");
                    return Err(ApiError::Unauthorized);
                }
            }

            let replay = self.dispatch(&request, Some(auth)).await?;
            return Self::decode(&request, replay).await;
        }

        Self::decode(&request, response).await
    }

    /// Refresh ahead of time if the access token expires within `skew`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the refresh is rejected.
    pub async fn ensure_fresh(
        &self,
        auth: &AuthSession,
        skew: chrono::Duration,
    ) -> Result<(), ApiError> {
        let tokens = auth.tokens();
        if !tokens.expires_within(skew) {
            return Ok(());
        }
        let Some(refresh_token) = tokens.refresh_token.as_deref() else {
            return Ok(());
        };

        debug!(expires_at = %tokens.expires_at, "Refreshing access token ahead of expiry");
        let renewed: TokenPair = self.refresh(refresh_token).await.map_err(|e| {
            warn!(error = %e, "Proactive token refresh failed");
            ApiError::Unauthorized
        })?;
        auth.replace(renewed.inherit_refresh_token(&tokens));
        Ok(())
    }

    /// Run `exchange` once per refresh token.
    ///
    /// Concurrent callers with the same token wait for the first one and
    /// share its result; failures are not remembered.
    pub(crate) async fn coalesce_refresh<F>(
        &self,
        refresh_token: &str,
        exchange: F,
    ) -> Result<TokenPair, ApiError>
    where
        F: Future<Output = Result<TokenPair, ApiError>>,
    {
        self.inner
            .refreshes
            .try_get_with(refresh_token.to_string(), exchange)
            .await
            .map_err(ApiError::from_shared)
    }

    pub(crate) async fn dispatch(
        &self,
        request: &ApiRequest,
        auth: Option<&AuthSession>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), self.url(&request.path))
            .header(ACCEPT, "application/json")
            .header(ACCEPT_LANGUAGE, self.locale.code());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(cookie) = &request.cookie {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(auth) = auth {
            builder = builder.bearer_auth(auth.access_token());
        }

        Ok(builder.send().await?)
    }

    pub(crate) async fn decode<T: DeserializeOwned>(
        request: &ApiRequest,
        response: reqwest::Response,
    ) -> Result<ApiResponse<T>, ApiError> {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        // Get response body as text first for better error diagnostics
        let text = response.text().await?;

        if !status.is_success() {
            let message = extract_message(&text);
            if status.is_server_error() {
                error!(
                    method = %request.method,
                    path = %request.path,
                    status = %status,
                    body = %text.chars().take(500).collect::<String>(),
                    "API returned server error"
                );
            } else {
                debug!(
                    method = %request.method,
                    path = %request.path,
                    status = %status,
                    message = %message,
                    "API rejected request"
                );
            }
            return Err(ApiError::from_status(status, message, retry_after));
        }

        let body = if text.trim().is_empty() {
            "{}"
        } else {
            text.as_str()
        };

        let envelope: Envelope<T> = serde_json::from_str(body).map_err(|e| {
            error!(
                path = %request.path,
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to decode API response"
            );
            e
        })?;

        let data = match envelope.data {
            Some(data) => data,
            // Endpoints without a payload decode `null` into `()`.
            None => serde_json::from_value(serde_json::Value::Null)?,
        };

        Ok(ApiResponse {
            data,
            message: envelope.message,
        })
    }

    // =========================================================================
    // Cache helpers
    // =========================================================================

    pub(crate) async fn cache_get(&self, key: &str) -> Option<CacheValue> {
        self.inner.cache.get(key).await
    }

    pub(crate) async fn cache_put(&self, key: String, value: CacheValue) {
        self.inner.cache.insert(key, value).await;
    }

    /// Drop every cached entry whose key starts with one of `prefixes`.
    pub(crate) async fn invalidate_prefixes(&self, prefixes: &[&str]) {
        let stale: Vec<Arc<String>> = self
            .inner
            .cache
            .iter()
            .filter(|(key, _)| prefixes.iter().any(|p| key.starts_with(p)))
            .map(|(key, _)| key)
            .collect();

        for key in stale {
            self.inner.cache.invalidate(key.as_str()).await;
        }
        debug!(?prefixes, "Invalidated cache entries");
    }

    /// Drop all cached products.
    pub async fn invalidate_products(&self) {
        self.invalidate_prefixes(crate::cache::prefix::PRODUCTS).await;
    }

    /// Drop all cached categories.
    pub async fn invalidate_categories(&self) {
        self.invalidate_prefixes(crate::cache::prefix::CATEGORIES).await;
    }

    /// Drop all cached attributes.
    pub async fn invalidate_attributes(&self) {
        self.invalidate_prefixes(crate::cache::prefix::ATTRIBUTES).await;
    }

    /// Drop cached store settings.
    pub async fn invalidate_settings(&self) {
        self.invalidate_prefixes(crate::cache::prefix::SETTINGS).await;
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn client() -> ApiClient {
        ApiClient::new(&ApiConfig::new("http://127.0.0.1:9/api/").unwrap()).unwrap()
    }

    #[test]
    fn test_url_joins_paths() {
        let client = client();
        assert_eq!(client.url("/products"), "http://127.0.0.1:9/api/products");
        assert_eq!(client.url("orders/1"), "http://127.0.0.1:9/api/orders/1");
    }

    #[test]
    fn test_with_locale_shares_inner() {
        let client = client();
        let en = client.with_locale(Locale::En);
        assert_eq!(en.locale(), Locale::En);
        assert_eq!(client.locale(), Locale::Vi);
        assert!(Arc::ptr_eq(&client.inner, &en.inner));
    }

    #[test]
    fn test_envelope_without_data() {
        let envelope: Envelope<()> =
            serde_json::from_str(r#"{"message":"Email sent"}"#).unwrap();
        assert!(envelope.data.is_none());
        assert_eq!(envelope.message.as_deref(), Some("Email sent"));
    }

    #[test]
    fn test_request_body_is_replayable() {
        let request = ApiRequest::post("/cart/items")
            .json(&serde_json::json!({"productId": "p1", "quantity": 1}))
            .unwrap();
        let replay = request.clone();
        assert_eq!(request.body, replay.body);
    }

    #[tokio::test]
    async fn test_refreshes_are_coalesced_per_token() {
        let client = client();
        let calls = AtomicU32::new(0);
        let exchange = || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 2;
            tokio::task::yield_now().await;
            Ok(TokenPair::new(format!("access-{n}"), Some(format!("refresh-{n}")), 900))
        };

        let (first, second) = tokio::join!(
            client.coalesce_refresh("refresh-1", exchange()),
            client.coalesce_refresh("refresh-1", exchange()),
        );
        let first = first.unwrap();
        assert_eq!(first, second.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A late caller with the consumed token gets the same pair.
        let late = client.coalesce_refresh("refresh-1", exchange()).await.unwrap();
        assert_eq!(late, first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_is_not_remembered() {
        let client = client();
        let rejected = client
            .coalesce_refresh("refresh-1", async { Err(ApiError::Unauthorized) })
            .await;
        assert!(matches!(rejected, Err(ApiError::Unauthorized)));

        let renewed = client
            .coalesce_refresh("refresh-1", async {
                Ok(TokenPair::new("access-2".into(), None, 900))
            })
            .await
            .unwrap();
        assert_eq!(renewed.access_token, "access-2");
    }

    #[tokio::test]
    async fn test_invalidate_prefixes() {
        let client = client();
        client
            .cache_put("product:vi/a".into(), CacheValue::Categories(vec![]))
            .await;
        client
            .cache_put("categories:vi".into(), CacheValue::Categories(vec![]))
            .await;

        client.invalidate_products().await;

        assert!(client.cache_get("product:vi/a").await.is_none());
        assert!(client.cache_get("categories:vi").await.is_some());
    }
}
