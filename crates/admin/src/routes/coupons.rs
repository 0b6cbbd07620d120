//! Coupon management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sapa_api::ApiError;
use sapa_api::types::{Coupon, CouponInput};
use sapa_core::{CouponId, CouponKind, CurrencyCode, Locale, PageRequest};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::forms;
use crate::middleware::RequireAdminAuth;
use crate::models::{FlashKind, push_flash};
use crate::page::{AdminPage, Pagination, flash_result};
use crate::state::AppState;
use crate::views::{format_datetime, money, parse_input_datetime, to_input_datetime};

const PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct CouponsQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponForm {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub min_order_value: String,
    #[serde(default)]
    pub max_discount: String,
    #[serde(default)]
    pub usage_limit: String,
    /// `datetime-local`, shop time.
    #[serde(default)]
    pub starts_at: String,
    #[serde(default)]
    pub ends_at: String,
    pub is_active: Option<String>,
}

impl CouponForm {
    #[must_use]
    pub fn from_coupon(coupon: &Coupon, locale: Locale) -> Self {
        Self {
            code: coupon.code.clone(),
            kind: kind_value(coupon.kind).to_string(),
            value: forms::amount_value(coupon.value, locale),
            min_order_value: coupon
                .min_order_value
                .map(|v| forms::amount_value(v, locale))
                .unwrap_or_default(),
            max_discount: coupon
                .max_discount
                .map(|v| forms::amount_value(v, locale))
                .unwrap_or_default(),
            usage_limit: coupon.usage_limit.map(|v| v.to_string()).unwrap_or_default(),
            starts_at: coupon.starts_at.as_ref().map(to_input_datetime).unwrap_or_default(),
            ends_at: coupon.ends_at.as_ref().map(to_input_datetime).unwrap_or_default(),
            is_active: coupon.is_active.then(|| "on".to_string()),
        }
    }

    #[must_use]
    pub fn is_percentage(&self) -> bool {
        self.kind.parse::<CouponKind>() != Ok(CouponKind::Fixed)
    }

    #[must_use]
    pub const fn active(&self) -> bool {
        forms::checked(self.is_active.as_ref())
    }

    /// Validate and build the API body.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn to_input(&self, locale: Locale) -> std::result::Result<CouponInput, String> {
        let code = forms::required("Code", &self.code)?.to_uppercase();
        if code.chars().any(char::is_whitespace) {
            return Err("Code cannot contain spaces.".to_string());
        }
        let kind: CouponKind = self.kind.parse()?;
        let value = forms::amount("Value", &self.value, locale)?;
        if value <= Decimal::ZERO {
            return Err("Value must be greater than zero.".to_string());
        }
        if kind == CouponKind::Percentage && value > Decimal::ONE_HUNDRED {
            return Err("A percentage cannot exceed 100.".to_string());
        }
        let starts_at = parse_input_datetime(&self.starts_at)?;
        let ends_at = parse_input_datetime(&self.ends_at)?;
        if let (Some(start), Some(end)) = (starts_at, ends_at)
            && end <= start
        {
            return Err("The end must be after the start.".to_string());
        }

        Ok(CouponInput {
            code,
            kind,
            value,
            min_order_value: forms::optional_amount("Minimum order", &self.min_order_value, locale)?,
            max_discount: forms::optional_amount("Maximum discount", &self.max_discount, locale)?,
            usage_limit: forms::optional_number("Usage limit", &self.usage_limit)?,
            starts_at,
            ends_at,
            is_active: self.active(),
        })
    }
}

const fn kind_value(kind: CouponKind) -> &'static str {
    match kind {
        CouponKind::Percentage => "PERCENTAGE",
        CouponKind::Fixed => "FIXED",
    }
}

#[derive(Debug, Clone)]
pub struct CouponRowView {
    pub id: String,
    pub code: String,
    pub discount: String,
    pub min_order: Option<String>,
    pub usage: String,
    pub window: String,
    pub state: &'static str,
    pub state_class: &'static str,
    pub edit_href: String,
}

impl CouponRowView {
    #[must_use]
    pub fn new(coupon: &Coupon, now: DateTime<Utc>, locale: Locale) -> Self {
        let currency = CurrencyCode::default();
        let discount = match coupon.kind {
            CouponKind::Percentage => {
                let cap = coupon
                    .max_discount
                    .map(|m| format!(" (max {})", money(m, currency, locale)))
                    .unwrap_or_default();
                format!("{}%{cap}", coupon.value.normalize())
            }
            CouponKind::Fixed => money(coupon.value, currency, locale),
        };
        let usage = coupon.usage_limit.map_or_else(
            || coupon.used_count.to_string(),
            |limit| format!("{} / {limit}", coupon.used_count),
        );
        let window = match (&coupon.starts_at, &coupon.ends_at) {
            (None, None) => "Always".to_string(),
            (Some(start), None) => format!("From {}", format_datetime(start, locale)),
            (None, Some(end)) => format!("Until {}", format_datetime(end, locale)),
            (Some(start), Some(end)) => format!(
                "{} to {}",
                format_datetime(start, locale),
                format_datetime(end, locale)
            ),
        };
        let (state, state_class) = coupon_state(coupon, now);
        Self {
            id: coupon.id.to_string(),
            code: coupon.code.clone(),
            discount,
            min_order: coupon.min_order_value.map(|m| money(m, currency, locale)),
            usage,
            window,
            state,
            state_class,
            edit_href: format!("/coupons/{}/edit", coupon.id),
        }
    }
}

/// Label and badge class for a coupon's current state.
fn coupon_state(coupon: &Coupon, now: DateTime<Utc>) -> (&'static str, &'static str) {
    if coupon.is_usable_at(now) {
        ("Live", "badge--success")
    } else if !coupon.is_active {
        ("Disabled", "badge--muted")
    } else if coupon.starts_at.is_some_and(|s| now < s) {
        ("Scheduled", "badge--info")
    } else if coupon.usage_limit.is_some_and(|l| coupon.used_count >= l) {
        ("Used up", "badge--warning")
    } else {
        ("Expired", "badge--muted")
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "coupons/index.html")]
pub struct CouponsIndexTemplate {
    pub page: AdminPage,
    pub coupons: Vec<CouponRowView>,
    pub pagination: Option<Pagination>,
}

#[derive(Template, WebTemplate)]
#[template(path = "coupons/form.html")]
pub struct CouponFormTemplate {
    pub page: AdminPage,
    pub title: String,
    pub action: String,
    pub form: CouponForm,
    pub error: Option<String>,
    pub delete_action: Option<String>,
    /// Usage so far, shown on edit.
    pub used_count: Option<u32>,
}

#[instrument(skip(state, auth, page))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    page: AdminPage,
    Query(query): Query<CouponsQuery>,
) -> Result<CouponsIndexTemplate> {
    let coupons = state
        .api()
        .list_coupons(PageRequest::new(query.page, Some(PAGE_SIZE)), &auth)
        .await?;
    let now = Utc::now();
    let locale = state.locale();
    Ok(CouponsIndexTemplate {
        page,
        coupons: coupons
            .items
            .iter()
            .map(|c| CouponRowView::new(c, now, locale))
            .collect(),
        pagination: Pagination::new(&coupons, "/coupons"),
    })
}

fn form_page(
    page: AdminPage,
    form: CouponForm,
    coupon_id: Option<&str>,
    used_count: Option<u32>,
    error: Option<String>,
) -> Response {
    let (title, action, delete_action) = match coupon_id {
        Some(id) => (
            format!("Edit {}", form.code),
            format!("/coupons/{id}"),
            Some(format!("/coupons/{id}/delete")),
        ),
        None => ("New coupon".to_string(), "/coupons".to_string(), None),
    };
    CouponFormTemplate {
        page,
        title,
        action,
        form,
        error,
        delete_action,
        used_count,
    }
    .into_response()
}

pub async fn new(RequireAdminAuth { .. }: RequireAdminAuth, page: AdminPage) -> Response {
    let form = CouponForm {
        kind: kind_value(CouponKind::Percentage).to_string(),
        is_active: Some("on".to_string()),
        ..CouponForm::default()
    };
    form_page(page, form, None, None, None)
}

#[instrument(skip(state, auth, session, page, form), fields(code = %form.code))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    page: AdminPage,
    Form(form): Form<CouponForm>,
) -> Result<Response> {
    let input = match form.to_input(state.locale()) {
        Ok(input) => input,
        Err(message) => return Ok(form_page(page, form, None, None, Some(message))),
    };
    match state.api().create_coupon(&input, &auth).await {
        Ok(coupon) => {
            tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "Coupon created");
            push_flash(&session, FlashKind::Success, format!("Created {}.", coupon.code)).await?;
            Ok(Redirect::to("/coupons").into_response())
        }
        Err(ApiError::Unauthorized) => Err(AppError::Api(ApiError::Unauthorized)),
        Err(e) => Ok(form_page(page, form, None, None, Some(e.user_message()))),
    }
}

#[instrument(skip(state, auth, page))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    page: AdminPage,
    Path(id): Path<String>,
) -> Result<Response> {
    let coupon = state
        .api()
        .get_coupon(&CouponId::new(id.as_str()), &auth)
        .await?;
    Ok(form_page(
        page,
        CouponForm::from_coupon(&coupon, state.locale()),
        Some(&id),
        Some(coupon.used_count),
        None,
    ))
}

#[instrument(skip(state, auth, session, page, form))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    page: AdminPage,
    Path(id): Path<String>,
    Form(form): Form<CouponForm>,
) -> Result<Response> {
    let input = match form.to_input(state.locale()) {
        Ok(input) => input,
        Err(message) => return Ok(form_page(page, form, Some(&id), None, Some(message))),
    };
    match state
        .api()
        .update_coupon(&CouponId::new(id.as_str()), &input, &auth)
        .await
    {
        Ok(coupon) => {
            tracing::info!(coupon_id = %coupon.id, "Coupon updated");
            push_flash(&session, FlashKind::Success, format!("Saved {}.", coupon.code)).await?;
            Ok(Redirect::to("/coupons").into_response())
        }
        Err(ApiError::Unauthorized) => Err(AppError::Api(ApiError::Unauthorized)),
        Err(e) => Ok(form_page(page, form, Some(&id), None, Some(e.user_message()))),
    }
}

#[instrument(skip(state, auth, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let result = state
        .api()
        .delete_coupon(&CouponId::new(id.as_str()), &auth)
        .await;
    flash_result(&session, result, "Coupon deleted.").await?;
    Ok(Redirect::to("/coupons"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn form() -> CouponForm {
        CouponForm {
            code: " tet2026 ".to_string(),
            kind: "PERCENTAGE".to_string(),
            value: "15".to_string(),
            max_discount: "50.000".to_string(),
            usage_limit: "100".to_string(),
            starts_at: "2026-02-01T00:00".to_string(),
            ends_at: "2026-02-15T23:59".to_string(),
            is_active: Some("on".to_string()),
            ..CouponForm::default()
        }
    }

    fn coupon() -> Coupon {
        Coupon {
            id: CouponId::new("cp1"),
            code: "TET2026".to_string(),
            kind: CouponKind::Percentage,
            value: Decimal::new(15, 0),
            min_order_value: None,
            max_discount: None,
            usage_limit: Some(2),
            used_count: 0,
            starts_at: None,
            ends_at: None,
            is_active: true,
        }
    }

    #[test]
    fn test_form_builds_input() {
        let input = form().to_input(Locale::Vi).unwrap();
        assert_eq!(input.code, "TET2026");
        assert_eq!(input.kind, CouponKind::Percentage);
        assert_eq!(input.max_discount, Some(Decimal::new(50_000, 0)));
        assert_eq!(input.usage_limit, Some(100));
        // Shop time is UTC+7.
        assert_eq!(
            input.starts_at,
            Some(Utc.with_ymd_and_hms(2026, 1, 31, 17, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_form_rejects_bad_values() {
        let mut f = form();
        f.value = "120".to_string();
        assert!(f.to_input(Locale::Vi).unwrap_err().contains("100"));

        let mut f = form();
        f.ends_at = "2026-01-01T00:00".to_string();
        assert!(f.to_input(Locale::Vi).unwrap_err().contains("after"));

        let mut f = form();
        f.code = "TET 2026".to_string();
        assert!(f.to_input(Locale::Vi).is_err());

        let mut f = form();
        f.kind = "BOGO".to_string();
        assert!(f.to_input(Locale::Vi).is_err());
    }

    #[test]
    fn test_fixed_coupon_may_exceed_one_hundred() {
        let mut f = form();
        f.kind = "FIXED".to_string();
        f.value = "200000".to_string();
        assert!(f.to_input(Locale::Vi).is_ok());
        assert!(!f.is_percentage());
    }

    #[test]
    fn test_coupon_state_labels() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(coupon_state(&coupon(), now).0, "Live");

        let mut c = coupon();
        c.used_count = 2;
        assert_eq!(coupon_state(&c, now).0, "Used up");

        let mut c = coupon();
        c.starts_at = Some(Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(coupon_state(&c, now).0, "Scheduled");

        let mut c = coupon();
        c.is_active = false;
        assert_eq!(coupon_state(&c, now).0, "Disabled");
    }

    #[test]
    fn test_edit_form_round_trips_window() {
        let mut c = coupon();
        c.ends_at = Some(Utc.with_ymd_and_hms(2026, 2, 15, 16, 59, 0).unwrap());
        let f = CouponForm::from_coupon(&c, Locale::Vi);
        assert_eq!(f.ends_at, "2026-02-15T23:59");
        assert_eq!(f.kind, "PERCENTAGE");
        assert_eq!(f.value, "15");
    }

    #[test]
    fn test_edit_form_amounts_parse_back() {
        let mut c = coupon();
        c.kind = CouponKind::Fixed;
        c.value = Decimal::new(5_000_000, 2);
        c.min_order_value = Some(Decimal::new(25, 1));
        for locale in Locale::all() {
            let input = CouponForm::from_coupon(&c, locale).to_input(locale).unwrap();
            assert_eq!(input.value, Decimal::new(50_000, 0));
            assert_eq!(input.min_order_value, Some(Decimal::new(25, 1)));
        }
    }
}
