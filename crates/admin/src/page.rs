//! Shared console chrome: signed-in admin, current path and flashes.
//!
//! Full-page templates embed an [`AdminPage`] as `page` and render it
//! through `base.html`. Extract it after [`crate::middleware::RequireAdminAuth`]
//! so a rejected request does not drain the pending flashes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sapa_api::ApiError;
use sapa_core::Page;
use tower_sessions::Session;

use crate::error::AppError;
use crate::middleware::current_admin;
use crate::models::{CurrentAdmin, Flash, FlashKind, push_flash, take_flashes};

/// Per-request data every console page needs.
#[derive(Debug, Clone)]
pub struct AdminPage {
    pub admin: Option<CurrentAdmin>,
    pub current_path: String,
    pub flashes: Vec<Flash>,
}

impl AdminPage {
    #[must_use]
    pub fn admin_name(&self) -> &str {
        self.admin.as_ref().map_or("", CurrentAdmin::display_name)
    }

    /// `true` when `prefix` is the current section, for sidebar highlighting.
    #[must_use]
    pub fn is_active(&self, prefix: &str) -> bool {
        if prefix == "/" {
            self.current_path == "/"
        } else {
            self.current_path.starts_with(prefix)
        }
    }
}

impl<S> FromRequestParts<S> for AdminPage
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let (admin, flashes) = match parts.extensions.get::<Session>().cloned() {
            Some(session) => (current_admin(&session).await, take_flashes(&session).await),
            None => (None, Vec::new()),
        };

        Ok(Self {
            admin,
            current_path: parts.uri.path().to_string(),
            flashes,
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
    /// `base` is the listing URL, possibly with a filter query already.
    #[must_use]
    pub fn new<T>(page: &Page<T>, base: &str) -> Option<Self> {
        let total = page.total_pages();
        if total <= 1 {
            return None;
        }
        let link = |n: u32| {
            let separator = if base.contains('?') { '&' } else { '?' };
            format!("{base}{separator}page={n}")
        };
        Some(Self {
            label: format!("Page {} of {total} ({} total)", page.page, page.total),
            prev_href: page.has_prev().then(|| link(page.page - 1)),
            next_href: page.has_next().then(|| link(page.page + 1)),
        })
    }
}

/// Build `path?k=v&...` from the non-empty pairs.
#[must_use]
pub fn with_query(path: &str, pairs: &[(&str, Option<&str>)]) -> String {
    let query: Vec<String> = pairs
        .iter()
        .filter_map(|(key, value)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{key}={}", urlencoding::encode(v)))
        })
        .collect();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", query.join("&"))
    }
}

/// Flash the outcome of a form action.
///
/// Success flashes `success`; API failures flash the API's message and
/// yield `None`. An expired login is passed on so the caller's `?` sends
/// the operator back to the login page.
///
/// # Errors
///
/// Returns `AppError::Api(Unauthorized)` or a session store error.
pub async fn flash_result<T>(
    session: &Session,
    result: Result<T, ApiError>,
    success: &str,
) -> Result<Option<T>, AppError> {
    match result {
        Ok(value) => {
            push_flash(session, FlashKind::Success, success).await?;
            Ok(Some(value))
        }
        Err(ApiError::Unauthorized) => Err(AppError::Api(ApiError::Unauthorized)),
        Err(err) => {
            if err.is_server_fault() {
                tracing::error!(error = %err, "API call failed");
            } else {
                tracing::debug!(error = %err, "API rejected request");
            }
            push_flash(session, FlashKind::Error, err.user_message()).await?;
            Ok(None)
        }
    }
}

/// Accept only same-site relative redirect targets.
#[must_use]
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

/// Blank form fields become `None`.
#[must_use]
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_with_query_skips_blanks_and_encodes() {
        assert_eq!(
            with_query("/orders", &[("status", Some("PENDING")), ("search", Some("  "))]),
            "/orders?status=PENDING"
        );
        assert_eq!(
            with_query("/users", &[("search", Some("lan@sapa.vn"))]),
            "/users?search=lan%40sapa.vn"
        );
        assert_eq!(with_query("/users", &[("role", None)]), "/users");
    }

    #[test]
    fn test_pagination_links_keep_filters() {
        let page = Page {
            items: vec![(); 20],
            total: 45,
            page: 2,
            limit: 20,
        };
        let p = Pagination::new(&page, "/orders?status=PENDING").unwrap();
        assert_eq!(p.label, "Page 2 of 3 (45 total)");
        assert_eq!(p.prev_href.as_deref(), Some("/orders?status=PENDING&page=1"));
        assert_eq!(p.next_href.as_deref(), Some("/orders?status=PENDING&page=3"));
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/orders?page=2")), Some("/orders?page=2"));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example")), None);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some(" x ")), Some("x".to_string()));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }
}
