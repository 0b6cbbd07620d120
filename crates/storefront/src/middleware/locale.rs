//! Locale-prefixed routing.
//!
//! Every page is addressed as `/{locale}/...`. This middleware runs in
//! front of the page router and either
//!
//! - strips a valid locale prefix, records it as [`RequestLocale`] and
//!   pins it in the `sapa_locale` cookie, or
//! - redirects a locale-less path to the negotiated locale: cookie first,
//!   then `Accept-Language`, then the configured default.
//!
//! Static assets, health checks and `/api/` are passed through untouched.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderMap, HeaderValue, Uri,
        header::{ACCEPT_LANGUAGE, COOKIE, SET_COOKIE},
        request::Parts,
        uri::PathAndQuery,
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use sapa_core::Locale;
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};

use crate::i18n::{I18n, localized_path};
use crate::state::AppState;

/// Cookie that remembers the visitor's language.
pub const LOCALE_COOKIE: &str = "sapa_locale";

const LOCALE_COOKIE_MAX_AGE_DAYS: i64 = 365;

/// Path prefixes that are never localised.
const EXEMPT_PREFIXES: &[&str] = &["/static/", "/health", "/api/", "/favicon.ico", "/robots.txt"];

/// The locale of the current request and its path without the prefix.
#[derive(Debug, Clone)]
pub struct RequestLocale {
    pub locale: Locale,
    /// Locale-less path including the query string, e.g. `/products?page=2`.
    pub path: String,
}

impl RequestLocale {
    #[must_use]
    pub fn i18n(&self) -> I18n {
        I18n::for_locale(self.locale)
    }

    /// Prefix an app path with this request's locale.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        localized_path(self.locale, path)
    }
}

impl<S> FromRequestParts<S> for RequestLocale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_else(|| {
            tracing::warn!("RequestLocale missing - locale middleware may be misconfigured");
            Self {
                locale: Locale::default(),
                path: parts
                    .uri
                    .path_and_query()
                    .map_or_else(|| "/".to_string(), ToString::to_string),
            }
        }))
    }
}

/// Resolve the request locale; see the module docs.
pub async fn locale_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_exempt(&path) {
        return next.run(request).await;
    }

    let query = request
        .uri()
        .query()
        .map(|q| format!("?{q}"))
        .unwrap_or_default();

    let Some((locale, rest)) = split_locale(&path) else {
        let locale = negotiate(request.headers(), state.config().default_locale);
        let target = format!("{}{query}", localized_path(locale, &path));
        tracing::debug!(%locale, target = %target, "Redirecting to localised path");
        return Redirect::temporary(&target).into_response();
    };

    let stripped = format!("{rest}{query}");
    let Some(uri) = replace_path(request.uri(), &stripped) else {
        return axum::http::StatusCode::BAD_REQUEST.into_response();
    };
    *request.uri_mut() = uri;

    let cookie_locale = cookie_locale(request.headers());
    request.extensions_mut().insert(RequestLocale {
        locale,
        path: stripped,
    });

    let mut response = next.run(request).await;
    // The language switcher sets its own cookie.
    let handler_pinned = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&format!("{LOCALE_COOKIE}=")));
    if cookie_locale != Some(locale)
        && !handler_pinned
        && let Ok(value) = HeaderValue::from_str(&locale_cookie(locale))
    {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

/// Cookie first, then `Accept-Language`, then `fallback`.
#[must_use]
pub fn negotiate(headers: &HeaderMap, fallback: Locale) -> Locale {
    cookie_locale(headers)
        .or_else(|| {
            headers
                .get(ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok())
                .and_then(Locale::from_accept_language)
        })
        .unwrap_or(fallback)
}

/// `Set-Cookie` value pinning `locale` for a year.
#[must_use]
pub fn locale_cookie(locale: Locale) -> String {
    Cookie::build((LOCALE_COOKIE, locale.code()))
        .path("/")
        .max_age(Duration::days(LOCALE_COOKIE_MAX_AGE_DAYS))
        .same_site(SameSite::Lax)
        .build()
        .to_string()
}

fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// `/vi/products` gives `(Vi, "/products")`; `/vi` gives `(Vi, "/")`.
fn split_locale(path: &str) -> Option<(Locale, String)> {
    let trimmed = path.strip_prefix('/')?;
    let (first, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
    let locale = first.parse::<Locale>().ok()?;
    Some((locale, format!("/{rest}")))
}

fn cookie_locale(headers: &HeaderMap) -> Option<Locale> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == LOCALE_COOKIE)
        .and_then(|(_, value)| value.parse().ok())
}

fn replace_path(uri: &Uri, path_and_query: &str) -> Option<Uri> {
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_split_locale() {
        assert_eq!(
            split_locale("/vi/products/ao-thun"),
            Some((Locale::Vi, "/products/ao-thun".to_string()))
        );
        assert_eq!(split_locale("/en"), Some((Locale::En, "/".to_string())));
        assert_eq!(split_locale("/en/"), Some((Locale::En, "/".to_string())));
        assert_eq!(split_locale("/products"), None);
        assert_eq!(split_locale("/"), None);
        assert_eq!(split_locale("/fr/products"), None);
    }

    #[test]
    fn test_negotiate_prefers_cookie() {
        let h = headers(&[
            ("cookie", "theme=dark; sapa_locale=en"),
            ("accept-language", "vi-VN,vi;q=0.9"),
        ]);
        assert_eq!(negotiate(&h, Locale::Vi), Locale::En);
    }

    #[test]
    fn test_negotiate_uses_accept_language_then_default() {
        let h = headers(&[("accept-language", "fr-FR, en;q=0.8")]);
        assert_eq!(negotiate(&h, Locale::Vi), Locale::En);

        let h = headers(&[("accept-language", "fr-FR, de;q=0.8")]);
        assert_eq!(negotiate(&h, Locale::Vi), Locale::Vi);
        assert_eq!(negotiate(&HeaderMap::new(), Locale::En), Locale::En);
    }

    #[test]
    fn test_invalid_cookie_is_ignored() {
        let h = headers(&[("cookie", "sapa_locale=fr"), ("accept-language", "en")]);
        assert_eq!(negotiate(&h, Locale::Vi), Locale::En);
    }

    #[test]
    fn test_locale_cookie_attributes() {
        let cookie = locale_cookie(Locale::En);
        assert!(cookie.starts_with("sapa_locale=en"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[test]
    fn test_exempt_paths() {
        assert!(is_exempt("/static/css/main.css"));
        assert!(is_exempt("/health/ready"));
        assert!(!is_exempt("/products"));
    }

    #[test]
    fn test_replace_path_keeps_query() {
        let uri: Uri = "/vi/products?page=2".parse().unwrap();
        let replaced = replace_path(&uri, "/products?page=2").unwrap();
        assert_eq!(replaced.path(), "/products");
        assert_eq!(replaced.query(), Some("page=2"));
    }
}
