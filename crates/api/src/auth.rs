//! Access/refresh token handling.
//!
//! The API issues a short-lived bearer access token and a long-lived refresh
//! token. The refresh token travels in a `refresh_token` cookie, both when the
//! API sets it and when we send it back to `POST /auth/refresh`.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before expiry at which a token counts as expired.
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// Name of the cookie that carries the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// A bearer access token plus the refresh token that renews it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TokenPair {
    /// Build a pair from an `expires_in` value in seconds.
    #[must_use]
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        }
    }

    /// True if the access token expires within `skew` from now.
    #[must_use]
    pub fn expires_within(&self, skew: Duration) -> bool {
        Utc::now() + skew >= self.expires_at
    }

    /// Check if the access token is expired (with 60s buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::seconds(EXPIRY_BUFFER_SECS))
    }

    /// When a proactive refresh should fire.
    #[must_use]
    pub fn refresh_due_at(&self, skew: Duration) -> DateTime<Utc> {
        self.expires_at - skew
    }

    /// Whether this pair can be renewed at all.
    #[must_use]
    pub const fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Keep the old refresh token when a refresh response omits a new one.
    #[must_use]
    pub fn inherit_refresh_token(mut self, previous: &Self) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token.clone_from(&previous.refresh_token);
        }
        self
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Tokens for one authenticated caller, shared across a handler's API calls.
///
/// The client replaces the tokens in place when it refreshes them after a
/// `401`. Callers check [`AuthSession::refreshed`] afterwards and persist
/// the new pair.
pub struct AuthSession {
    tokens: Mutex<TokenPair>,
    refreshed: AtomicBool,
}

impl AuthSession {
    #[must_use]
    pub const fn new(tokens: TokenPair) -> Self {
        Self {
            tokens: Mutex::new(tokens),
            refreshed: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current tokens.
    #[must_use]
    pub fn tokens(&self) -> TokenPair {
        self.lock().clone()
    }

    #[must_use]
    pub fn access_token(&self) -> String {
        self.lock().access_token.clone()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.lock().refresh_token.clone()
    }

    /// Install a renewed pair and mark the session as refreshed.
    pub fn replace(&self, tokens: TokenPair) {
        *self.lock() = tokens;
        self.refreshed.store(true, Ordering::Release);
    }

    /// Whether the tokens changed since this session was created.
    #[must_use]
    pub fn refreshed(&self) -> bool {
        self.refreshed.load(Ordering::Acquire)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TokenPair> {
        // A poisoned lock still holds a valid pair.
        self.tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("tokens", &*self.lock())
            .field("refreshed", &self.refreshed())
            .finish()
    }
}

/// Token fields in login/register/refresh response bodies.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

const fn default_expires_in() -> i64 {
    900
}

impl TokenResponse {
    /// Combine with a refresh token taken from `Set-Cookie`, body first.
    pub(crate) fn into_pair(self, cookie_refresh: Option<String>) -> TokenPair {
        TokenPair::new(
            self.access_token,
            self.refresh_token.or(cookie_refresh),
            self.expires_in,
        )
    }
}

/// Find the refresh token in a response's `Set-Cookie` headers.
pub(crate) fn refresh_token_from_headers(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(parse_refresh_cookie)
}

/// Parse `refresh_token=<value>; Path=/; HttpOnly` style cookie strings.
fn parse_refresh_cookie(set_cookie: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    (name.trim() == REFRESH_COOKIE && !value.is_empty()).then(|| value.trim().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pair(expires_in: i64) -> TokenPair {
        TokenPair::new("access".into(), Some("refresh".into()), expires_in)
    }

    #[test]
    fn test_is_expired_uses_buffer() {
        assert!(!pair(3600).is_expired());
        assert!(pair(30).is_expired());
        assert!(pair(-10).is_expired());
    }

    #[test]
    fn test_expires_within() {
        let tokens = pair(120);
        assert!(!tokens.expires_within(Duration::seconds(60)));
        assert!(tokens.expires_within(Duration::seconds(180)));
    }

    #[test]
    fn test_refresh_due_at() {
        let tokens = pair(900);
        let due = tokens.refresh_due_at(Duration::seconds(60));
        assert_eq!(tokens.expires_at - due, Duration::seconds(60));
    }

    #[test]
    fn test_inherit_refresh_token() {
        let old = pair(10);
        let renewed = TokenPair::new("new".into(), None, 900).inherit_refresh_token(&old);
        assert_eq!(renewed.refresh_token.as_deref(), Some("refresh"));

        let rotated =
            TokenPair::new("new".into(), Some("rotated".into()), 900).inherit_refresh_token(&old);
        assert_eq!(rotated.refresh_token.as_deref(), Some("rotated"));
    }

    #[test]
    fn test_auth_session_replace_marks_refreshed() {
        let session = AuthSession::new(pair(900));
        assert!(!session.refreshed());
        session.replace(TokenPair::new("second".into(), None, 900));
        assert!(session.refreshed());
        assert_eq!(session.access_token(), "second");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug = format!("{:?}", pair(900));
        assert!(!debug.contains("access\""));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_parse_refresh_cookie() {
        assert_eq!(
            parse_refresh_cookie("refresh_token=abc.def; Path=/; HttpOnly; SameSite=Strict"),
            Some("abc.def".to_string())
        );
        assert_eq!(parse_refresh_cookie("other=1; Path=/"), None);
        assert_eq!(parse_refresh_cookie("refresh_token=; Max-Age=0"), None);
    }

    #[test]
    fn test_token_response_prefers_body() {
        let body: TokenResponse =
            serde_json::from_str(r#"{"accessToken":"a","refreshToken":"b","expiresIn":600}"#)
                .unwrap();
        let tokens = body.into_pair(Some("cookie".into()));
        assert_eq!(tokens.refresh_token.as_deref(), Some("b"));

        let body: TokenResponse = serde_json::from_str(r#"{"accessToken":"a"}"#).unwrap();
        let tokens = body.into_pair(Some("cookie".into()));
        assert_eq!(tokens.refresh_token.as_deref(), Some("cookie"));
    }
}
