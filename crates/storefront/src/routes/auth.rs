//! Authentication route handlers.
//!
//! Login, registration and password reset against the REST API. Tokens
//! never leave the server: they live in the session next to the
//! [`CurrentCustomer`] built from the API's user record.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use sapa_api::types::{LoginRequest, RegisterRequest, ResetPasswordRequest};
use sapa_api::{ApiError, AuthSession};
use sapa_core::Email;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::i18n::I18n;
use crate::middleware::{RequestLocale, sign_in, sign_out};
use crate::models::{CurrentCustomer, FlashKind, push_flash};
use crate::page::{PageContext, api_error_message, safe_next};
use crate::routes::account::MIN_PASSWORD_LENGTH;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    #[serde(deserialize_with = "secret")]
    pub password: SecretString,
    /// Locale-less path to return to.
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(deserialize_with = "secret")]
    pub password: SecretString,
    #[serde(deserialize_with = "secret")]
    pub password_confirm: SecretString,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data. The token comes from the emailed link.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub token: String,
    #[serde(deserialize_with = "secret")]
    pub password: SecretString,
    #[serde(deserialize_with = "secret")]
    pub password_confirm: SecretString,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
    /// Set when a session ended because its tokens could not be refreshed.
    pub expired: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetQuery {
    pub token: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub error: Option<String>,
    pub email: String,
    pub next: String,
    pub expired: bool,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub error: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub min_password_length: usize,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub ctx: PageContext,
    pub error: Option<String>,
    pub success: Option<String>,
    pub email: String,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub ctx: PageContext,
    pub error: Option<String>,
    pub token: String,
    pub min_password_length: usize,
}

// =============================================================================
// Validation
// =============================================================================

/// Check a new password and its confirmation.
///
/// # Errors
///
/// Returns the translation key of the problem.
pub fn validate_new_password(
    password: &SecretString,
    confirm: &SecretString,
) -> std::result::Result<(), &'static str> {
    if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err("password.error.too_short");
    }
    if password.expose_secret() != confirm.expose_secret() {
        return Err("password.error.mismatch");
    }
    Ok(())
}

/// Check the registration form and build the API body.
///
/// # Errors
///
/// Returns the translation key of the first problem found.
pub fn validate_registration(form: &RegisterForm) -> std::result::Result<RegisterRequest, &'static str> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err("account.error.name");
    }
    let email = Email::parse(&form.email).map_err(|_| "auth.error.email")?;
    validate_new_password(&form.password, &form.password_confirm)?;
    Ok(RegisterRequest {
        name: name.to_string(),
        email: email.as_str().to_string(),
        password: form.password.expose_secret().to_string(),
        phone: form
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from),
    })
}

/// Message for a failed login. The API answers bad credentials with 401.
fn login_error(i18n: &I18n, err: &ApiError) -> String {
    match err {
        ApiError::Unauthorized => i18n.t("auth.error.credentials").to_string(),
        other => api_error_message(i18n, other),
    }
}

// =============================================================================
// Login
// =============================================================================

/// Display the login page.
#[instrument(skip(state, session, ctx))]
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    mut ctx: PageContext,
    Query(query): Query<LoginQuery>,
) -> Response {
    let expired = query.expired.is_some();
    if ctx.is_logged_in() {
        if !expired {
            return Redirect::to(&ctx.url("/account")).into_response();
        }
        // Leftover identity from a login the API already ended.
        sign_out(&session, &state).await;
        ctx.customer = None;
    }
    LoginTemplate {
        error: None,
        email: String::new(),
        next: safe_next(query.next.as_deref()).unwrap_or_default().to_string(),
        expired,
        ctx,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, ctx, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let request = LoginRequest {
        email: form.email.trim().to_string(),
        password: form.password.expose_secret().to_string(),
    };

    let result = match state.api(ctx.locale).login(&request).await {
        Ok(result) => result,
        Err(e) => {
            tracing::info!(error = %e, "Login failed");
            return Ok(LoginTemplate {
                error: Some(login_error(&ctx.i18n, &e)),
                email: request.email,
                next: safe_next(form.next.as_deref()).unwrap_or_default().to_string(),
                expired: false,
                ctx,
            }
            .into_response());
        }
    };

    let customer = CurrentCustomer::from(&result.user);
    sign_in(&session, &state, &customer, result.tokens).await?;
    add_breadcrumb("auth", "Customer logged in", None);
    tracing::info!(customer_id = %customer.id, "Customer logged in");

    let welcome = ctx
        .i18n
        .format("auth.welcome", &[("name", &customer.display_name())]);
    push_flash(&session, FlashKind::Success, welcome).await?;

    let next = safe_next(form.next.as_deref()).unwrap_or("/");
    Ok(Redirect::to(&ctx.url(next)).into_response())
}

// =============================================================================
// Registration
// =============================================================================

/// Display the registration page.
#[instrument(skip(ctx))]
pub async fn register_page(ctx: PageContext) -> Response {
    if ctx.is_logged_in() {
        return Redirect::to(&ctx.url("/account")).into_response();
    }
    RegisterTemplate {
        error: None,
        name: String::new(),
        email: String::new(),
        phone: String::new(),
        min_password_length: MIN_PASSWORD_LENGTH,
        ctx,
    }
    .into_response()
}

/// Handle registration. A new account is signed in straight away.
#[instrument(skip(state, session, ctx, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let outcome = match validate_registration(&form) {
        Ok(request) => state
            .api(ctx.locale)
            .register(&request)
            .await
            .map_err(|e| api_error_message(&ctx.i18n, &e)),
        Err(key) => Err(ctx.t(key).to_string()),
    };

    let result = match outcome {
        Ok(result) => result,
        Err(error) => {
            return Ok(RegisterTemplate {
                error: Some(error),
                name: form.name,
                email: form.email,
                phone: form.phone.unwrap_or_default(),
                min_password_length: MIN_PASSWORD_LENGTH,
                ctx,
            }
            .into_response());
        }
    };

    let customer = CurrentCustomer::from(&result.user);
    sign_in(&session, &state, &customer, result.tokens).await?;
    tracing::info!(customer_id = %customer.id, "Customer registered");
    push_flash(&session, FlashKind::Success, ctx.t("auth.registered")).await?;

    Ok(Redirect::to(&ctx.url("/")).into_response())
}

// =============================================================================
// Password Reset
// =============================================================================

/// Display the forgot password page.
#[instrument(skip(ctx))]
pub async fn forgot_password_page(ctx: PageContext) -> impl IntoResponse {
    ForgotPasswordTemplate {
        error: None,
        success: None,
        email: String::new(),
        ctx,
    }
}

/// Ask the API to email a reset link and say so on the same page.
#[instrument(skip(state, ctx, form))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ctx: PageContext,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    let email = form.email.trim().to_string();
    if Email::parse(&email).is_err() {
        return ForgotPasswordTemplate {
            error: Some(ctx.t("auth.error.email").to_string()),
            success: None,
            email,
            ctx,
        }
        .into_response();
    }

    match state.api(ctx.locale).forgot_password(&email).await {
        Ok(message) => ForgotPasswordTemplate {
            error: None,
            success: Some(message.unwrap_or_else(|| ctx.t("auth.reset_sent").to_string())),
            email: String::new(),
            ctx,
        }
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Password recovery request failed");
            ForgotPasswordTemplate {
                error: Some(api_error_message(&ctx.i18n, &e)),
                success: None,
                email,
                ctx,
            }
            .into_response()
        }
    }
}

/// Display the reset password page. Without a token there is nothing to do.
#[instrument(skip(ctx, query))]
pub async fn reset_password_page(ctx: PageContext, Query(query): Query<ResetQuery>) -> Response {
    match query.token.filter(|t| !t.trim().is_empty()) {
        Some(token) => ResetPasswordTemplate {
            error: None,
            token,
            min_password_length: MIN_PASSWORD_LENGTH,
            ctx,
        }
        .into_response(),
        None => Redirect::to(&ctx.url("/auth/forgot-password")).into_response(),
    }
}

/// Set the new password, then send the customer to log in with it.
#[instrument(skip(state, session, ctx, form))]
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response> {
    let outcome = match validate_new_password(&form.password, &form.password_confirm) {
        Ok(()) => {
            let request = ResetPasswordRequest {
                token: form.token.clone(),
                password: form.password.expose_secret().to_string(),
            };
            state
                .api(ctx.locale)
                .reset_password(&request)
                .await
                .map_err(|e| api_error_message(&ctx.i18n, &e))
        }
        Err(key) => Err(ctx.t(key).to_string()),
    };

    match outcome {
        Ok(message) => {
            let message = message.unwrap_or_else(|| ctx.t("auth.password_reset").to_string());
            push_flash(&session, FlashKind::Success, message).await?;
            Ok(Redirect::to(&ctx.url("/auth/login")).into_response())
        }
        Err(error) => Ok(ResetPasswordTemplate {
            error: Some(error),
            token: form.token,
            min_password_length: MIN_PASSWORD_LENGTH,
            ctx,
        }
        .into_response()),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Drop the local session, then revoke the tokens on the API (best effort).
#[instrument(skip(state, session))]
pub async fn logout(
    State(state): State<AppState>,
    locale: RequestLocale,
    session: Session,
) -> Result<Redirect> {
    if let Some(tokens) = sign_out(&session, &state).await {
        let auth = AuthSession::new(tokens);
        if let Err(e) = state.api(locale.locale).logout(&auth).await {
            tracing::warn!(error = %e, "Failed to revoke API session");
        }
    }
    push_flash(&session, FlashKind::Info, locale.i18n().t("auth.logged_out")).await?;
    Ok(Redirect::to(&locale.url("/")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    fn registration(name: &str, email: &str, password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            name: name.to_string(),
            email: email.to_string(),
            phone: Some("  ".to_string()),
            password: secret(password),
            password_confirm: secret(confirm),
        }
    }

    #[test]
    fn test_new_password_rules() {
        assert_eq!(
            validate_new_password(&secret("short"), &secret("short")),
            Err("password.error.too_short")
        );
        assert_eq!(
            validate_new_password(&secret("longenough"), &secret("different1")),
            Err("password.error.mismatch")
        );
        assert!(validate_new_password(&secret("longenough"), &secret("longenough")).is_ok());
    }

    #[test]
    fn test_registration_builds_request() {
        let request =
            validate_registration(&registration(" Lan ", "lan@sapa.vn", "matkhau123", "matkhau123"))
                .unwrap();
        assert_eq!(request.name, "Lan");
        assert_eq!(request.email, "lan@sapa.vn");
        assert_eq!(request.phone, None);
    }

    #[test]
    fn test_registration_rejects_bad_email() {
        let err = validate_registration(&registration("Lan", "not-an-email", "matkhau123", "matkhau123"))
            .unwrap_err();
        assert_eq!(err, "auth.error.email");
    }

    #[test]
    fn test_bad_credentials_message() {
        let i18n = I18n::for_locale(sapa_core::Locale::En);
        assert_eq!(
            login_error(&i18n, &ApiError::Unauthorized),
            i18n.t("auth.error.credentials")
        );
    }
}
