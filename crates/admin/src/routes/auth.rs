//! Authentication route handlers.
//!
//! Operators sign in with their API account. Only active `ADMIN` users get
//! a console session; anyone else has the freshly issued tokens revoked
//! straight away.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use sapa_api::types::LoginRequest;
use sapa_api::{ApiError, AuthSession};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{sign_in, sign_out};
use crate::models::CurrentAdmin;
use crate::page::{AdminPage, safe_next};
use crate::state::AppState;

/// Shown for bad credentials and for non-admin accounts alike.
const INVALID_LOGIN: &str = "Invalid email or password, or the account has no admin access.";

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    #[serde(deserialize_with = "secret")]
    pub password: SecretString,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
    pub expired: Option<String>,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: AdminPage,
    pub error: Option<String>,
    pub email: String,
    pub next: String,
    pub expired: bool,
}

fn login_error(err: &ApiError) -> String {
    match err {
        ApiError::Unauthorized | ApiError::Forbidden => INVALID_LOGIN.to_string(),
        other => other.user_message(),
    }
}

/// Display the login page.
#[instrument(skip(session, page))]
pub async fn login_page(
    session: Session,
    mut page: AdminPage,
    Query(query): Query<LoginQuery>,
) -> Response {
    let expired = query.expired.is_some();
    if page.admin.is_some() {
        if !expired {
            return Redirect::to("/").into_response();
        }
        sign_out(&session).await;
        page.admin = None;
    }
    LoginTemplate {
        page,
        error: None,
        email: String::new(),
        next: safe_next(query.next.as_deref()).unwrap_or_default().to_string(),
        expired,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, page, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: AdminPage,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let request = LoginRequest {
        email: form.email.trim().to_string(),
        password: form.password.expose_secret().to_string(),
    };
    let next = safe_next(form.next.as_deref()).unwrap_or_default().to_string();
    let rejected = |page, email, error| {
        LoginTemplate {
            page,
            error: Some(error),
            email,
            next: next.clone(),
            expired: false,
        }
        .into_response()
    };

    let result = match state.api().login(&request).await {
        Ok(result) => result,
        Err(e) => {
            tracing::info!(error = %e, "Admin login failed");
            return Ok(rejected(page, request.email, login_error(&e)));
        }
    };

    let Some(admin) = CurrentAdmin::from_user(&result.user) else {
        tracing::warn!(user_id = %result.user.id, role = %result.user.role, "Non-admin login refused");
        let auth = AuthSession::new(result.tokens);
        if let Err(e) = state.api().logout(&auth).await {
            tracing::debug!(error = %e, "Failed to revoke refused login");
        }
        return Ok(rejected(page, request.email, INVALID_LOGIN.to_string()));
    };

    sign_in(&session, &admin, &result.tokens).await?;
    add_breadcrumb("auth", "Admin logged in", &[]);
    tracing::info!(admin_id = %admin.id, "Admin logged in");

    let target = if next.is_empty() { "/" } else { next.as_str() };
    Ok(Redirect::to(target).into_response())
}

/// Log out locally and revoke the API tokens.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Redirect {
    if let Some(tokens) = sign_out(&session).await {
        let auth = AuthSession::new(tokens);
        if let Err(e) = state.api().logout(&auth).await {
            tracing::debug!(error = %e, "API logout failed; local session cleared anyway");
        }
    }
    tracing::info!("Admin logged out");
    Redirect::to("/auth/login")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_does_not_reveal_role() {
        assert_eq!(login_error(&ApiError::Unauthorized), INVALID_LOGIN);
        assert_eq!(login_error(&ApiError::Forbidden), INVALID_LOGIN);
    }
}
