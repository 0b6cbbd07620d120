//! Authentication middleware and extractors.
//!
//! A logged-in session holds a [`CurrentCustomer`] and [`StoredTokens`].
//! [`RequireAuth`] loads both, folds in any pair the scheduled refresh
//! produced, refreshes proactively when the access token is about to
//! expire and hands the handler an [`AuthSession`] for its API calls.
//! [`token_writeback_middleware`] persists tokens renewed during those
//! calls once the handler has finished.

use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{Method, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use sapa_api::{AuthSession, TokenPair};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::{SessionExpired, clear_sentry_user, set_sentry_user};
use crate::middleware::locale::RequestLocale;
use crate::models::{CurrentCustomer, StoredTokens, session_keys};
use crate::state::AppState;

/// Extractor that requires a logged-in customer.
///
/// If the customer is not logged in, redirects to the login page with a
/// `next` parameter pointing back at the current page.
///
/// # Example
///
/// ```rust,ignore
/// async fn cart(State(state): State<AppState>, RequireAuth { auth, .. }: RequireAuth) {
///     let cart = state.api(locale).get_cart(&auth).await?;
/// }
/// ```
pub struct RequireAuth {
    pub customer: CurrentCustomer,
    pub auth: Arc<AuthSession>,
}

/// Error returned when authentication is required but the customer is not logged in.
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin(String),
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl AuthRejection {
    fn for_request(parts: &Parts, locale: &RequestLocale, expired: bool) -> Self {
        Self::for_target(parts.uri.path(), &parts.method, locale, expired)
    }

    fn for_target(path: &str, method: &Method, locale: &RequestLocale, expired: bool) -> Self {
        if path.starts_with("/api/") {
            return Self::Unauthorized;
        }
        Self::RedirectToLogin(login_url(method, locale, expired))
    }
}

/// Localized login URL that returns to the current page after sign-in.
fn login_url(method: &Method, locale: &RequestLocale, expired: bool) -> String {
    let mut target = String::from("/auth/login");
    let mut separator = '?';
    // A form post cannot be replayed by a redirect; only pages come back.
    if *method == Method::GET {
        target.push_str(&format!("?next={}", urlencoding::encode(&locale.path)));
        separator = '&';
    }
    if expired {
        target.push(separator);
        target.push_str("expired=1");
    }
    locale.url(&target)
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(target) => Redirect::to(&target).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(locale) = RequestLocale::from_request_parts(parts, state).await;

        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;

        let customer: Option<CurrentCustomer> = session
            .get(session_keys::CURRENT_CUSTOMER)
            .await
            .ok()
            .flatten();
        let stored: Option<StoredTokens> =
            session.get(session_keys::TOKENS).await.ok().flatten();

        let (Some(customer), Some(mut stored)) = (customer, stored) else {
            return Err(AuthRejection::for_request(parts, &locale, false));
        };

        // A scheduled refresh may have completed since the last request.
        if let Some(renewed) = state.tokens().sync(stored.key, &stored.tokens) {
            stored.tokens = renewed;
            if let Err(e) = session.insert(session_keys::TOKENS, &stored).await {
                tracing::warn!(error = %e, "Failed to store refreshed tokens");
            }
        }

        let auth = Arc::new(AuthSession::new(stored.tokens.clone()));
        if let Err(e) = state
            .api(locale.locale)
            .ensure_fresh(&auth, state.tokens().skew())
            .await
        {
            tracing::info!(error = %e, customer_id = %customer.id, "Session tokens expired");
            sign_out(&session, state).await;
            return Err(AuthRejection::for_request(parts, &locale, true));
        }

        if let Some(slot) = parts.extensions.get::<TokenSlot>() {
            slot.set(stored.key, Arc::clone(&auth));
        }

        Ok(Self { customer, auth })
    }
}

/// Extractor that optionally authenticates.
///
/// Unlike `RequireAuth`, this does not reject the request if the customer
/// is not logged in (or their tokens can no longer be refreshed).
pub struct OptionalAuth(pub Option<RequireAuth>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(RequireAuth::from_request_parts(parts, state).await.ok()))
    }
}

/// Handoff between [`RequireAuth`] and [`token_writeback_middleware`].
#[derive(Clone, Default)]
struct TokenSlot(Arc<Mutex<Option<(Uuid, Arc<AuthSession>)>>>);

impl TokenSlot {
    fn set(&self, key: Uuid, auth: Arc<AuthSession>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some((key, auth));
    }

    fn take(&self) -> Option<(Uuid, Arc<AuthSession>)> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Persist tokens the API client renewed while the handler ran.
///
/// Skipped when the session was logged out or logged in again meanwhile.
/// A handler that failed with an expired login gets the session cleared
/// and a redirect to the localized login page instead.
pub async fn token_writeback_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let slot = TokenSlot::default();
    request.extensions_mut().insert(slot.clone());
    let session = request.extensions().get::<Session>().cloned();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let locale = request.extensions().get::<RequestLocale>().cloned();

    let response = next.run(request).await;

    if response.extensions().get::<SessionExpired>().is_some() {
        slot.take();
        if let Some(session) = &session {
            tracing::info!(path = %path, "API rejected session tokens, signing out");
            sign_out(session, &state).await;
        }
        return match locale {
            Some(locale) => AuthRejection::for_target(&path, &method, &locale, true).into_response(),
            None => response,
        };
    }

    let (Some(session), Some((key, auth))) = (session, slot.take()) else {
        return response;
    };
    if !auth.refreshed() {
        return response;
    }

    let still_current = session
        .get::<StoredTokens>(session_keys::TOKENS)
        .await
        .ok()
        .flatten()
        .is_some_and(|stored| stored.key == key);
    if still_current {
        let tokens = auth.tokens();
        state.tokens().sync(key, &tokens);
        if let Err(e) = session
            .insert(session_keys::TOKENS, StoredTokens { key, tokens })
            .await
        {
            tracing::warn!(error = %e, "Failed to store refreshed tokens");
        }
    }

    response
}

/// Log the customer in: new session id, identity, tokens and a scheduled refresh.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_in(
    session: &Session,
    state: &AppState,
    customer: &CurrentCustomer,
    tokens: TokenPair,
) -> Result<(), tower_sessions::session::Error> {
    if let Some(previous) = session
        .get::<StoredTokens>(session_keys::TOKENS)
        .await?
    {
        state.tokens().forget(previous.key);
    }

    session.cycle_id().await?;
    let stored = StoredTokens::new(tokens);
    session
        .insert(session_keys::CURRENT_CUSTOMER, customer)
        .await?;
    session.insert(session_keys::TOKENS, &stored).await?;
    state.tokens().sync(stored.key, &stored.tokens);

    set_sentry_user(&customer.id, Some(&customer.email));
    Ok(())
}

/// Log out locally: cancel the scheduled refresh and drop identity and tokens.
///
/// Returns the tokens that were stored so the caller can revoke them.
pub async fn sign_out(session: &Session, state: &AppState) -> Option<TokenPair> {
    let stored = session
        .remove::<StoredTokens>(session_keys::TOKENS)
        .await
        .ok()
        .flatten();
    if let Some(stored) = &stored {
        state.tokens().forget(stored.key);
    }
    if let Err(e) = session
        .remove::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await
    {
        tracing::warn!(error = %e, "Failed to clear customer from session");
    }
    if let Err(e) = session.cycle_id().await {
        tracing::warn!(error = %e, "Failed to cycle session id");
    }

    clear_sentry_user();
    stored.map(|s| s.tokens)
}

/// The logged-in customer, without touching tokens. For page chrome.
pub async fn current_customer(session: &Session) -> Option<CurrentCustomer> {
    session
        .get(session_keys::CURRENT_CUSTOMER)
        .await
        .ok()
        .flatten()
}

#[cfg(test)]
mod tests {
    use sapa_core::Locale;

    use super::*;

    fn english(path: &str) -> RequestLocale {
        RequestLocale {
            locale: Locale::En,
            path: path.to_string(),
        }
    }

    #[test]
    fn test_login_url_returns_to_page() {
        assert_eq!(
            login_url(&Method::GET, &english("/orders?page=2"), true),
            "/en/auth/login?next=%2Forders%3Fpage%3D2&expired=1"
        );
    }

    #[test]
    fn test_login_url_skips_next_for_posts() {
        assert_eq!(
            login_url(&Method::POST, &english("/cart/items"), true),
            "/en/auth/login?expired=1"
        );
        assert_eq!(
            login_url(&Method::POST, &english("/cart/items"), false),
            "/en/auth/login"
        );
    }

    #[test]
    fn test_api_paths_get_401() {
        let rejection = AuthRejection::for_target("/api/cart", &Method::GET, &english("/"), true);
        assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
