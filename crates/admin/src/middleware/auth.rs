//! Authentication middleware and extractors for admin.
//!
//! A signed-in admin session holds a [`CurrentAdmin`] and the API
//! [`TokenPair`] issued at login. [`RequireAdminAuth`] refreshes the pair
//! when it is about to expire; [`token_writeback_middleware`] stores any
//! pair renewed by a `401` replay during the handler.

use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{FromRequestParts, OriginalUri, Request},
    http::{Method, StatusCode, Uri, request::Parts, uri::PathAndQuery},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use sapa_api::{AuthSession, DEFAULT_REFRESH_SKEW, TokenPair};
use tower_sessions::Session;

use crate::error::{SessionExpired, clear_sentry_user, set_sentry_user};
use crate::models::{CurrentAdmin, session_keys};
use crate::state::AppState;

/// Extractor that requires admin authentication.
///
/// If the admin is not logged in, returns a redirect to the login page
/// for HTML requests, or 401 Unauthorized for `/api/` requests.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     State(state): State<AppState>,
///     RequireAdminAuth { auth, .. }: RequireAdminAuth,
/// ) -> Result<impl IntoResponse> {
///     let stats = state.api().dashboard_stats(&auth).await?;
/// }
/// ```
pub struct RequireAdminAuth {
    pub admin: CurrentAdmin,
    pub auth: Arc<AuthSession>,
}

/// Error returned when admin authentication is required but the user is not logged in.
#[derive(Debug)]
pub enum AdminAuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin(String),
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl AdminAuthRejection {
    /// Nested routers see a stripped URI; the login target needs the full one.
    fn for_request(parts: &Parts, expired: bool) -> Self {
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);
        Self::for_target(uri, &parts.method, expired)
    }

    fn for_target(uri: &Uri, method: &Method, expired: bool) -> Self {
        if uri.path().starts_with("/api/") {
            return Self::Unauthorized;
        }
        let mut params = Vec::new();
        if *method == Method::GET {
            let here = uri.path_and_query().map_or("/", PathAndQuery::as_str);
            params.push(format!("next={}", urlencoding::encode(here)));
        }
        if expired {
            params.push("expired=1".to_string());
        }
        if params.is_empty() {
            Self::RedirectToLogin("/auth/login".to_string())
        } else {
            Self::RedirectToLogin(format!("/auth/login?{}", params.join("&")))
        }
    }
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(target) => Redirect::to(&target).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAdminAuth {
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AdminAuthRejection::Unauthorized)?;

        let admin: Option<CurrentAdmin> = session
            .get(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten();
        let tokens: Option<TokenPair> = session.get(session_keys::TOKENS).await.ok().flatten();

        let (Some(admin), Some(tokens)) = (admin, tokens) else {
            return Err(AdminAuthRejection::for_request(parts, false));
        };

        let auth = Arc::new(AuthSession::new(tokens));
        if let Err(e) = state.api().ensure_fresh(&auth, DEFAULT_REFRESH_SKEW).await {
            tracing::info!(error = %e, admin_id = %admin.id, "Admin tokens expired");
            sign_out(&session).await;
            return Err(AdminAuthRejection::for_request(parts, true));
        }
        if auth.refreshed() {
            store_tokens(&session, &auth.tokens()).await;
        }

        if let Some(slot) = parts.extensions.get::<TokenSlot>() {
            slot.set(Arc::clone(&auth));
        }

        Ok(Self { admin, auth })
    }
}

/// Handoff between [`RequireAdminAuth`] and [`token_writeback_middleware`].
#[derive(Clone, Default)]
struct TokenSlot(Arc<Mutex<Option<Arc<AuthSession>>>>);

impl TokenSlot {
    fn set(&self, auth: Arc<AuthSession>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(auth);
    }

    fn take(&self) -> Option<Arc<AuthSession>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Persist tokens the API client renewed while the handler ran.
///
/// Skipped when the handler logged the admin out. A handler that failed
/// with an expired login gets the session cleared instead, so the login
/// page does not bounce the admin straight back.
pub async fn token_writeback_middleware(
    mut request: Request,
    next: Next,
) -> Response {
    let slot = TokenSlot::default();
    request.extensions_mut().insert(slot.clone());
    let session = request.extensions().get::<Session>().cloned();
    let uri = request.uri().clone();
    let method = request.method().clone();

    let response = next.run(request).await;

    if response.extensions().get::<SessionExpired>().is_some() {
        slot.take();
        if let Some(session) = &session {
            tracing::info!(path = %uri.path(), "API rejected admin tokens, signing out");
            sign_out(session).await;
        }
        return AdminAuthRejection::for_target(&uri, &method, true).into_response();
    }

    if let (Some(session), Some(auth)) = (session, slot.take())
        && auth.refreshed()
        && current_admin(&session).await.is_some()
    {
        store_tokens(&session, &auth.tokens()).await;
    }

    response
}

async fn store_tokens(session: &Session, tokens: &TokenPair) {
    if let Err(e) = session.insert(session_keys::TOKENS, tokens).await {
        tracing::warn!(error = %e, "Failed to store refreshed tokens");
    }
}

/// Log the admin in: new session id, identity and tokens.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_in(
    session: &Session,
    admin: &CurrentAdmin,
    tokens: &TokenPair,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await?;
    session.insert(session_keys::TOKENS, tokens).await?;
    set_sentry_user(&admin.id, Some(&admin.email));
    Ok(())
}

/// Log out locally. Returns the stored tokens so the caller can revoke them.
pub async fn sign_out(session: &Session) -> Option<TokenPair> {
    let tokens = session
        .remove::<TokenPair>(session_keys::TOKENS)
        .await
        .ok()
        .flatten();
    if let Err(e) = session
        .remove::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await
    {
        tracing::warn!(error = %e, "Failed to clear admin from session");
    }
    if let Err(e) = session.cycle_id().await {
        tracing::warn!(error = %e, "Failed to cycle session id");
    }
    clear_sentry_user();
    tokens
}

/// The signed-in admin, without touching tokens.
pub async fn current_admin(session: &Session) -> Option<CurrentAdmin> {
    session
        .get(session_keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request as HttpRequest;

    use super::*;

    fn parts(method: Method, uri: &str) -> Parts {
        HttpRequest::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    fn target(rejection: AdminAuthRejection) -> String {
        match rejection {
            AdminAuthRejection::RedirectToLogin(target) => target,
            AdminAuthRejection::Unauthorized => String::from("401"),
        }
    }

    #[test]
    fn test_pages_return_after_login() {
        let rejection = AdminAuthRejection::for_request(&parts(Method::GET, "/orders?page=2"), false);
        assert_eq!(target(rejection), "/auth/login?next=%2Forders%3Fpage%3D2");
    }

    #[test]
    fn test_posts_are_not_replayed() {
        let rejection =
            AdminAuthRejection::for_request(&parts(Method::POST, "/orders/o1/status"), true);
        assert_eq!(target(rejection), "/auth/login?expired=1");
    }

    #[test]
    fn test_nested_routes_keep_their_prefix() {
        let mut parts = parts(Method::GET, "/?status=PENDING");
        parts
            .extensions
            .insert(OriginalUri("/orders?status=PENDING".parse().unwrap()));
        let rejection = AdminAuthRejection::for_request(&parts, false);
        assert_eq!(
            target(rejection),
            "/auth/login?next=%2Forders%3Fstatus%3DPENDING"
        );
    }

    #[test]
    fn test_api_paths_get_401() {
        let rejection = AdminAuthRejection::for_request(&parts(Method::GET, "/api/stats"), false);
        assert!(matches!(rejection, AdminAuthRejection::Unauthorized));
    }
}
