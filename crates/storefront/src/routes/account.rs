//! Account route handlers: profile, password and the address book.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use sapa_api::{
    ApiError,
    types::{AddressInput, PasswordChange, ProfileUpdate},
};
use sapa_core::AddressId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::breadcrumbs::Crumb;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequestLocale, RequireAuth};
use crate::models::{CurrentCustomer, FlashKind, push_flash, session_keys};
use crate::page::{PageContext, api_error_message, flash_result};
use crate::state::AppState;
use crate::views::AddressView;

/// Shortest password the forms accept; the API has the final say.
pub const MIN_PASSWORD_LENGTH: usize = 8;

// =============================================================================
// Forms
// =============================================================================

/// Profile form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    pub phone: Option<String>,
}

/// Change password form data.
#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

/// Address form data, shared with the checkout page.
///
/// Every field is a string so the form binds even when inputs are empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub line1: String,
    pub line2: Option<String>,
    pub ward: Option<String>,
    pub district: Option<String>,
    #[serde(default)]
    pub city: String,
    pub postal_code: Option<String>,
    /// Checkbox: present (any value) when ticked.
    pub is_default: Option<String>,
}

fn optional(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl AddressForm {
    /// Validate required fields and build the API body.
    ///
    /// # Errors
    ///
    /// Returns the translation key of the first problem found.
    pub fn to_input(&self) -> std::result::Result<AddressInput, &'static str> {
        let required = [
            (&self.full_name, "address.error.full_name"),
            (&self.phone, "address.error.phone"),
            (&self.line1, "address.error.line1"),
            (&self.city, "address.error.city"),
        ];
        if let Some((_, key)) = required.iter().find(|(v, _)| v.trim().is_empty()) {
            return Err(*key);
        }
        let phone_digits = self.phone.chars().filter(char::is_ascii_digit).count();
        if !(9..=15).contains(&phone_digits) {
            return Err("address.error.phone");
        }

        Ok(AddressInput {
            full_name: self.full_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            line1: self.line1.trim().to_string(),
            line2: optional(self.line2.as_ref()),
            ward: optional(self.ward.as_ref()),
            district: optional(self.district.as_ref()),
            city: self.city.trim().to_string(),
            country: None,
            postal_code: optional(self.postal_code.as_ref()),
            is_default: self.is_default.is_some(),
        })
    }

    /// Prefill from a saved address.
    #[must_use]
    pub fn from_input(input: &AddressInput) -> Self {
        Self {
            full_name: input.full_name.clone(),
            phone: input.phone.clone(),
            line1: input.line1.clone(),
            line2: input.line2.clone(),
            ward: input.ward.clone(),
            district: input.district.clone(),
            city: input.city.clone(),
            postal_code: input.postal_code.clone(),
            is_default: input.is_default.then(|| "on".to_string()),
        }
    }

    // Template accessors for optional fields.

    #[must_use]
    pub fn line2_value(&self) -> &str {
        self.line2.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn ward_value(&self) -> &str {
        self.ward.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn district_value(&self) -> &str {
        self.district.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn postal_code_value(&self) -> &str {
        self.postal_code.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub const fn is_default_checked(&self) -> bool {
        self.is_default.is_some()
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Profile and password page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub ctx: PageContext,
    pub crumbs: Vec<Crumb>,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub min_password_length: usize,
}

/// Address book template.
#[derive(Template, WebTemplate)]
#[template(path = "account/addresses.html")]
pub struct AddressesTemplate {
    pub ctx: PageContext,
    pub crumbs: Vec<Crumb>,
    pub addresses: Vec<AddressView>,
    pub error: Option<String>,
}

/// New/edit address form template.
#[derive(Template, WebTemplate)]
#[template(path = "account/address_form.html")]
pub struct AddressFormTemplate {
    pub ctx: PageContext,
    pub crumbs: Vec<Crumb>,
    pub form: AddressForm,
    /// Form target, already localized.
    pub action: String,
    pub is_edit: bool,
}

// =============================================================================
// Profile
// =============================================================================

/// Display the profile page.
#[instrument(skip(state, auth, customer, ctx))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth { customer, auth }: RequireAuth,
    ctx: PageContext,
) -> Result<Response> {
    // Phone is not kept in the session; fall back to the session copy if
    // the profile cannot be fetched.
    let (name, phone) = match state.api(ctx.locale).me(&auth).await {
        Ok(user) => (user.name, user.phone.unwrap_or_default()),
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load profile");
            (customer.name.clone(), String::new())
        }
    };

    Ok(AccountIndexTemplate {
        crumbs: ctx.breadcrumbs(&[]),
        email: customer.email,
        name,
        phone,
        min_password_length: MIN_PASSWORD_LENGTH,
        ctx,
    }
    .into_response())
}

/// Update name and phone.
#[instrument(skip(state, auth, customer, session, form))]
pub async fn update_profile(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { customer, auth }: RequireAuth,
    session: Session,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect> {
    let i18n = locale.i18n();
    let back = locale.url("/account");

    let name = form.name.trim();
    if name.is_empty() {
        push_flash(&session, FlashKind::Error, i18n.t("account.error.name")).await?;
        return Ok(Redirect::to(&back));
    }

    let update = ProfileUpdate {
        name: name.to_string(),
        phone: optional(form.phone.as_ref()),
    };
    let result = state.api(locale.locale).update_profile(&update, &auth).await;
    if let Some(user) = flash_result(&session, &i18n, result, "account.profile_updated").await? {
        // Keep the header greeting in step with the new name.
        let refreshed = CurrentCustomer {
            name: user.name,
            ..customer
        };
        session
            .insert(session_keys::CURRENT_CUSTOMER, &refreshed)
            .await?;
    }
    Ok(Redirect::to(&back))
}

/// Validate a password change form.
///
/// # Errors
///
/// Returns the translation key describing the problem.
pub fn validate_password_change(form: &PasswordForm) -> std::result::Result<(), &'static str> {
    if form.new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("password.error.too_short");
    }
    if form.new_password != form.new_password_confirm {
        return Err("password.error.mismatch");
    }
    if form.new_password == form.current_password {
        return Err("password.error.unchanged");
    }
    Ok(())
}

/// Change the password.
#[instrument(skip(state, auth, session, form))]
pub async fn change_password(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
    Form(form): Form<PasswordForm>,
) -> Result<Redirect> {
    let i18n = locale.i18n();
    if let Err(key) = validate_password_change(&form) {
        push_flash(&session, FlashKind::Error, i18n.t(key)).await?;
        return Ok(Redirect::to(&locale.url("/account")));
    }

    let change = PasswordChange {
        current_password: form.current_password,
        new_password: form.new_password,
    };
    let result = state.api(locale.locale).change_password(&change, &auth).await;
    flash_result(&session, &i18n, result, "password.changed").await?;
    Ok(Redirect::to(&locale.url("/account")))
}

// =============================================================================
// Addresses
// =============================================================================

/// Display the address book.
#[instrument(skip(state, auth, ctx))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth { auth, .. }: RequireAuth,
    ctx: PageContext,
) -> Result<Response> {
    let (addresses, error) = match state.api(ctx.locale).list_addresses(&auth).await {
        Ok(list) => (
            list.iter().map(|a| AddressView::new(a, ctx.locale)).collect(),
            None,
        ),
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
        Err(e) => (Vec::new(), Some(api_error_message(&ctx.i18n, &e))),
    };

    Ok(AddressesTemplate {
        crumbs: ctx.breadcrumbs(&[]),
        addresses,
        error,
        ctx,
    }
    .into_response())
}

/// Display the new address form.
#[instrument(skip(_auth, ctx))]
pub async fn new_address(_auth: RequireAuth, ctx: PageContext) -> impl IntoResponse {
    AddressFormTemplate {
        crumbs: ctx.breadcrumbs(&[]),
        form: AddressForm::default(),
        action: ctx.url("/account/addresses"),
        is_edit: false,
        ctx,
    }
}

/// Create an address.
#[instrument(skip(state, auth, session, form))]
pub async fn create_address(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
    Form(form): Form<AddressForm>,
) -> Result<Redirect> {
    let i18n = locale.i18n();
    let input = match form.to_input() {
        Ok(input) => input,
        Err(key) => {
            push_flash(&session, FlashKind::Error, i18n.t(key)).await?;
            return Ok(Redirect::to(&locale.url("/account/addresses/new")));
        }
    };

    let result = state.api(locale.locale).create_address(&input, &auth).await;
    match flash_result(&session, &i18n, result, "address.created").await? {
        Some(_) => Ok(Redirect::to(&locale.url("/account/addresses"))),
        None => Ok(Redirect::to(&locale.url("/account/addresses/new"))),
    }
}

/// Display the edit form for one address.
#[instrument(skip(state, auth, ctx))]
pub async fn edit_address(
    State(state): State<AppState>,
    RequireAuth { auth, .. }: RequireAuth,
    ctx: PageContext,
    Path(id): Path<String>,
) -> Result<Response> {
    // There is no single-address endpoint; the book is small.
    let address = state
        .api(ctx.locale)
        .list_addresses(&auth)
        .await?
        .into_iter()
        .find(|a| a.id.as_ref().is_some_and(|a_id| a_id.as_str() == id))
        .ok_or_else(|| AppError::NotFound(format!("address {id}")))?;

    Ok(AddressFormTemplate {
        crumbs: ctx.breadcrumbs(&[(id.as_str(), address.full_name.as_str())]),
        form: AddressForm::from_input(&AddressInput::from(&address)),
        action: ctx.url(&format!("/account/addresses/{id}")),
        is_edit: true,
        ctx,
    }
    .into_response())
}

/// Update an address.
#[instrument(skip(state, auth, session, form))]
pub async fn update_address(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<AddressForm>,
) -> Result<Redirect> {
    let i18n = locale.i18n();
    let edit = locale.url(&format!("/account/addresses/{id}/edit"));
    let input = match form.to_input() {
        Ok(input) => input,
        Err(key) => {
            push_flash(&session, FlashKind::Error, i18n.t(key)).await?;
            return Ok(Redirect::to(&edit));
        }
    };

    let result = state
        .api(locale.locale)
        .update_address(&AddressId::new(id), &input, &auth)
        .await;
    match flash_result(&session, &i18n, result, "address.updated").await? {
        Some(_) => Ok(Redirect::to(&locale.url("/account/addresses"))),
        None => Ok(Redirect::to(&edit)),
    }
}

/// Delete an address.
#[instrument(skip(state, auth, session))]
pub async fn delete_address(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let result = state
        .api(locale.locale)
        .delete_address(&AddressId::new(id), &auth)
        .await;
    flash_result(&session, &locale.i18n(), result, "address.deleted").await?;
    Ok(Redirect::to(&locale.url("/account/addresses")))
}
