//! Store-wide settings.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use sapa_api::ApiError;
use sapa_api::types::Settings;
use sapa_core::{CurrencyCode, Locale};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::forms;
use crate::middleware::RequireAdminAuth;
use crate::models::{FlashKind, push_flash};
use crate::page::{AdminPage, non_empty};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub store_name: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub default_locale: String,
    #[serde(default)]
    pub shipping_fee: String,
    #[serde(default)]
    pub free_shipping_threshold: String,
}

impl SettingsForm {
    #[must_use]
    pub fn from_settings(settings: &Settings, locale: Locale) -> Self {
        Self {
            store_name: settings.store_name.clone(),
            contact_email: settings.contact_email.clone().unwrap_or_default(),
            contact_phone: settings.contact_phone.clone().unwrap_or_default(),
            address: settings.address.clone().unwrap_or_default(),
            currency: settings.currency.code().to_string(),
            default_locale: settings.default_locale.code().to_string(),
            shipping_fee: forms::amount_value(settings.shipping_fee, locale),
            free_shipping_threshold: settings
                .free_shipping_threshold
                .map(|t| forms::amount_value(t, locale))
                .unwrap_or_default(),
        }
    }

    /// Amounts are read with the console `locale`, not the store default.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn to_settings(&self, locale: Locale) -> std::result::Result<Settings, String> {
        let store_name = forms::required("Store name", &self.store_name)?;
        let contact_email = non_empty(Some(&self.contact_email));
        if let Some(email) = &contact_email
            && sapa_core::Email::parse(email).is_err()
        {
            return Err(format!("Contact email is not valid: {email}"));
        }
        let currency: CurrencyCode = self.currency.parse()?;
        let default_locale: Locale = self
            .default_locale
            .parse()
            .map_err(|_| format!("Unsupported language: {}", self.default_locale))?;
        Ok(Settings {
            store_name: store_name.to_string(),
            contact_email,
            contact_phone: non_empty(Some(&self.contact_phone)),
            address: non_empty(Some(&self.address)),
            currency,
            default_locale,
            shipping_fee: forms::optional_amount("Shipping fee", &self.shipping_fee, locale)?
                .unwrap_or_default(),
            free_shipping_threshold: forms::optional_amount(
                "Free shipping threshold",
                &self.free_shipping_threshold,
                locale,
            )?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ChoiceView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub page: AdminPage,
    pub form: SettingsForm,
    pub currencies: Vec<ChoiceView>,
    pub locales: Vec<ChoiceView>,
    pub error: Option<String>,
}

fn render(page: AdminPage, form: SettingsForm, error: Option<String>) -> Response {
    let currencies = [CurrencyCode::VND, CurrencyCode::USD]
        .into_iter()
        .map(|c| ChoiceView {
            value: c.code(),
            label: c.code(),
            selected: form.currency == c.code(),
        })
        .collect();
    let locales = Locale::all()
        .into_iter()
        .map(|l| ChoiceView {
            value: l.code(),
            label: l.native_name(),
            selected: form.default_locale == l.code(),
        })
        .collect();
    SettingsTemplate {
        page,
        form,
        currencies,
        locales,
        error,
    }
    .into_response()
}

#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth { .. }: RequireAdminAuth,
    page: AdminPage,
) -> Result<Response> {
    let settings = state.api().get_settings().await?;
    Ok(render(page, SettingsForm::from_settings(&settings, state.locale()), None))
}

#[instrument(skip(state, auth, session, page, form))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    page: AdminPage,
    Form(form): Form<SettingsForm>,
) -> Result<Response> {
    let settings = match form.to_settings(state.locale()) {
        Ok(settings) => settings,
        Err(message) => return Ok(render(page, form, Some(message))),
    };
    match state.api().update_settings(&settings, &auth).await {
        Ok(_) => {
            add_breadcrumb("settings", "Settings updated", &[]);
            tracing::info!("Store settings updated");
            push_flash(&session, FlashKind::Success, "Settings saved.").await?;
            Ok(Redirect::to("/settings").into_response())
        }
        Err(ApiError::Unauthorized) => Err(AppError::Api(ApiError::Unauthorized)),
        Err(e) => Ok(render(page, form, Some(e.user_message()))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn form() -> SettingsForm {
        SettingsForm {
            store_name: "Sapa Shop".to_string(),
            contact_email: "hotro@sapa.vn".to_string(),
            currency: "vnd".to_string(),
            default_locale: "vi".to_string(),
            shipping_fee: "30.000".to_string(),
            free_shipping_threshold: "500000".to_string(),
            ..SettingsForm::default()
        }
    }

    #[test]
    fn test_form_builds_settings() {
        let settings = form().to_settings(Locale::Vi).unwrap();
        assert_eq!(settings.currency, CurrencyCode::VND);
        assert_eq!(settings.default_locale, Locale::Vi);
        assert_eq!(settings.shipping_fee, Decimal::new(30_000, 0));
        assert_eq!(settings.free_shipping_threshold, Some(Decimal::new(500_000, 0)));
        assert_eq!(settings.address, None);
    }

    #[test]
    fn test_form_rejects_bad_values() {
        let mut f = form();
        f.contact_email = "not-an-email".to_string();
        assert!(f.to_settings(Locale::Vi).is_err());

        let mut f = form();
        f.currency = "EUR".to_string();
        assert!(f.to_settings(Locale::Vi).is_err());

        let mut f = form();
        f.default_locale = "fr".to_string();
        assert!(f.to_settings(Locale::Vi).is_err());

        // An English console reads "30.000" as thirty, then "1,5" is ambiguous.
        let mut f = form();
        f.free_shipping_threshold = "1,5".to_string();
        assert_eq!(
            form().to_settings(Locale::En).unwrap().shipping_fee,
            Decimal::new(30, 0)
        );
        assert!(f.to_settings(Locale::En).is_err());
    }

    #[test]
    fn test_settings_round_trip_through_form() {
        let settings = form().to_settings(Locale::Vi).unwrap();
        let again = SettingsForm::from_settings(&settings, Locale::Vi).to_settings(Locale::Vi).unwrap();
        assert_eq!(settings, again);
    }
}
