//! Shared page chrome: locale, customer, flashes and the CSP nonce.
//!
//! Every full-page template embeds a [`PageContext`] as `ctx` and renders
//! it through `base.html`. Action handlers that redirect should not extract
//! it, since extraction drains the pending flashes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sapa_api::ApiError;
use sapa_core::{Locale, Page};
use tower_sessions::Session;

use crate::breadcrumbs::{Crumb, breadcrumbs};
use crate::error::AppError;
use crate::i18n::{I18n, localized_path};
use crate::middleware::{CspNonce, RequestLocale, current_customer};
use crate::models::{CurrentCustomer, Flash, FlashKind, push_flash, take_flashes};
use crate::state::AppState;

/// Link to the current page in another language.
#[derive(Debug, Clone)]
pub struct LanguageLink {
    pub code: &'static str,
    pub label: &'static str,
    pub href: String,
    pub active: bool,
}

/// Per-request data every page needs.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub locale: Locale,
    pub i18n: I18n,
    pub customer: Option<CurrentCustomer>,
    pub flashes: Vec<Flash>,
    pub nonce: String,
    /// Locale-less path and query of this page.
    pub path: String,
    pub languages: Vec<LanguageLink>,
}

impl PageContext {
    #[must_use]
    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        self.i18n.t(key)
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        localized_path(self.locale, path)
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.customer.is_some()
    }

    #[must_use]
    pub fn customer_name(&self) -> &str {
        self.customer
            .as_ref()
            .map_or("", CurrentCustomer::display_name)
    }

    /// Login page that returns here afterwards.
    #[must_use]
    pub fn login_url(&self) -> String {
        self.url(&format!("/auth/login?next={}", urlencoding::encode(&self.path)))
    }

    /// Trail for this page; `labels` names slugs the translations cannot.
    #[must_use]
    pub fn breadcrumbs(&self, labels: &[(&str, &str)]) -> Vec<Crumb> {
        breadcrumbs(self.locale, &self.path, labels)
    }

    /// `true` when `prefix` is the current section, for nav highlighting.
    #[must_use]
    pub fn is_active(&self, prefix: &str) -> bool {
        let path = self.path.split('?').next().unwrap_or_default();
        if prefix == "/" {
            path == "/"
        } else {
            path.starts_with(prefix)
        }
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(request_locale) = RequestLocale::from_request_parts(parts, state).await;
        let Ok(CspNonce(nonce)) = CspNonce::from_request_parts(parts, state).await;

        let (customer, flashes) = match parts.extensions.get::<Session>().cloned() {
            Some(session) => (
                current_customer(&session).await,
                take_flashes(&session).await,
            ),
            None => (None, Vec::new()),
        };

        let RequestLocale { locale, path } = request_locale;
        let languages = Locale::all()
            .into_iter()
            .map(|other| LanguageLink {
                code: other.code(),
                label: other.native_name(),
                href: localized_path(other, &path),
                active: other == locale,
            })
            .collect();

        Ok(Self {
            locale,
            i18n: I18n::for_locale(locale),
            customer,
            flashes,
            nonce,
            path,
            languages,
        })
    }
}

/// Previous/next links for a paged listing.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub label: String,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

impl Pagination {
    /// `base` is the localized listing URL, possibly with a query already.
    #[must_use]
    pub fn new<T>(page: &Page<T>, base: &str, i18n: &I18n) -> Option<Self> {
        Self::with_param(page, base, "page", i18n)
    }

    /// Like [`Pagination::new`] with a custom page parameter name.
    #[must_use]
    pub fn with_param<T>(page: &Page<T>, base: &str, param: &str, i18n: &I18n) -> Option<Self> {
        let total = page.total_pages();
        if total <= 1 {
            return None;
        }
        let link = |n: u32| {
            let separator = if base.contains('?') { '&' } else { '?' };
            format!("{base}{separator}{param}={n}")
        };
        Some(Self {
            label: i18n.format(
                "pagination.page_of",
                &[("page", &page.page), ("total", &total)],
            ),
            prev_href: page.has_prev().then(|| link(page.page - 1)),
            next_href: page.has_next().then(|| link(page.page + 1)),
        })
    }
}

/// Text for an API failure in the visitor's language.
///
/// The API's own message wins when it sent one meant for users.
#[must_use]
pub fn api_error_message(i18n: &I18n, err: &ApiError) -> String {
    err.server_message()
        .map_or_else(|| i18n.t(err.message_key()).to_string(), ToString::to_string)
}

/// Queue an error flash describing `err`.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn flash_api_error(
    session: &Session,
    i18n: &I18n,
    err: &ApiError,
) -> Result<(), tower_sessions::session::Error> {
    if err.is_server_fault() {
        tracing::error!(error = %err, "API call failed");
    } else {
        tracing::debug!(error = %err, "API rejected request");
    }
    push_flash(session, FlashKind::Error, api_error_message(i18n, err)).await
}

/// Flash the outcome of a form action.
///
/// Success flashes `success_key`; API failures flash their message and
/// yield `None`. A rejected login is the one failure passed on, so the
/// caller's `?` sends the visitor to the login page.
///
/// # Errors
///
/// Returns `AppError::Api(Unauthorized)` or a session store error.
pub async fn flash_result<T>(
    session: &Session,
    i18n: &I18n,
    result: Result<T, ApiError>,
    success_key: &str,
) -> Result<Option<T>, AppError> {
    match result {
        Ok(value) => {
            push_flash(session, FlashKind::Success, i18n.t(success_key)).await?;
            Ok(Some(value))
        }
        Err(ApiError::Unauthorized) => Err(AppError::Api(ApiError::Unauthorized)),
        Err(err) => {
            flash_api_error(session, i18n, &err).await?;
            Ok(None)
        }
    }
}

/// Accept only same-site relative redirect targets.
#[must_use]
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

/// `true` for requests issued by HTMX.
#[must_use]
pub fn is_htmx(headers: &axum::http::HeaderMap) -> bool {
    headers.get("hx-request").is_some_and(|v| v == "true")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/orders/o1")), Some("/orders/o1"));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn test_pagination_links() {
        let page = Page {
            items: vec![(); 12],
            total: 36,
            page: 2,
            limit: 12,
        };
        let i18n = I18n::for_locale(Locale::En);
        let p = Pagination::new(&page, "/en/products?sort=newest", &i18n).unwrap();
        assert_eq!(p.label, "Page 2 of 3");
        assert_eq!(
            p.prev_href.as_deref(),
            Some("/en/products?sort=newest&page=1")
        );
        assert_eq!(p.next_href.as_deref(), Some("/en/products?sort=newest&page=3"));
    }

    #[test]
    fn test_single_page_has_no_pagination() {
        let page: Page<()> = Page {
            items: Vec::new(),
            total: 3,
            page: 1,
            limit: 12,
        };
        assert!(Pagination::new(&page, "/vi/orders", &I18n::for_locale(Locale::Vi)).is_none());
    }

    #[test]
    fn test_api_error_message_prefers_server_text() {
        let i18n = I18n::for_locale(Locale::Vi);
        let err = ApiError::Validation("Mã giảm giá đã hết hạn".to_string());
        assert_eq!(api_error_message(&i18n, &err), "Mã giảm giá đã hết hạn");

        let err = ApiError::Forbidden;
        assert_eq!(api_error_message(&i18n, &err), i18n.t("error.forbidden"));
    }
}
