//! Checkout route handlers.
//!
//! The API prices the order, validates stock and the coupon and empties
//! the cart; this side only collects the address, payment method and note.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use sapa_api::{ApiError, types::CheckoutRequest};
use sapa_core::{AddressId, OrderId, PaymentMethod};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::breadcrumbs::Crumb;
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequestLocale, RequireAuth};
use crate::models::{FlashKind, push_flash};
use crate::page::{PageContext, flash_api_error};
use crate::routes::account::AddressForm;
use crate::state::AppState;
use crate::views::{AddressView, CartView, OrderDetailView, PaymentOption, payment_options};

/// Value of the address radio that selects the inline form.
const NEW_ADDRESS: &str = "new";

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    /// A saved address id, or `new` for the inline address fields.
    pub address_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
    pub note: Option<String>,
    #[serde(flatten)]
    pub address: AddressForm,
}

impl CheckoutForm {
    /// Build the API request.
    ///
    /// # Errors
    ///
    /// Returns the translation key of the problem with the inline address.
    pub fn to_request(&self) -> std::result::Result<CheckoutRequest, &'static str> {
        let saved = self
            .address_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != NEW_ADDRESS);

        let (address_id, shipping_address) = match saved {
            Some(id) => (Some(AddressId::new(id)), None),
            None => (None, Some(self.address.to_input()?)),
        };

        let trimmed = |v: Option<&String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Ok(CheckoutRequest {
            address_id,
            shipping_address,
            payment_method: self.payment_method,
            coupon_code: trimmed(self.coupon_code.as_ref()).map(|c| c.to_uppercase()),
            note: trimmed(self.note.as_ref()),
        })
    }
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub crumbs: Vec<Crumb>,
    pub cart: CartView,
    pub addresses: Vec<AddressView>,
    pub payment_options: Vec<PaymentOption>,
    pub form: AddressForm,
}

/// Order placed page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct CheckoutSuccessTemplate {
    pub ctx: PageContext,
    pub order: OrderDetailView,
}

/// Display the checkout page. An empty cart sends the visitor back.
#[instrument(skip(state, auth, ctx))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth { auth, .. }: RequireAuth,
    ctx: PageContext,
) -> Result<Response> {
    let api = state.api(ctx.locale);
    let (cart, addresses) = tokio::join!(api.get_cart(&auth), api.list_addresses(&auth));

    let cart = cart?;
    if cart.is_empty() {
        return Ok(Redirect::to(&ctx.url("/cart")).into_response());
    }

    let addresses = match addresses {
        Ok(list) => list,
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load addresses for checkout");
            Vec::new()
        }
    };

    Ok(CheckoutTemplate {
        crumbs: ctx.breadcrumbs(&[]),
        cart: CartView::new(&cart, ctx.locale),
        addresses: addresses
            .iter()
            .map(|a| AddressView::new(a, ctx.locale))
            .collect(),
        payment_options: payment_options(&ctx.i18n),
        form: AddressForm::default(),
        ctx,
    }
    .into_response())
}

/// Place the order.
#[instrument(skip(state, auth, customer, session, form), fields(customer_id = %customer.id))]
pub async fn place(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, customer }: RequireAuth,
    session: Session,
    Form(form): Form<CheckoutForm>,
) -> Result<Redirect> {
    let i18n = locale.i18n();
    let back = locale.url("/checkout");

    let request = match form.to_request() {
        Ok(request) => request,
        Err(key) => {
            push_flash(&session, FlashKind::Error, i18n.t(key)).await?;
            return Ok(Redirect::to(&back));
        }
    };

    match state.api(locale.locale).checkout(&request, &auth).await {
        Ok(order) => {
            tracing::info!(order_id = %order.id, order_number = %order.order_number, "Order placed");
            crate::error::add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));
            push_flash(&session, FlashKind::Success, i18n.t("checkout.placed")).await?;
            Ok(Redirect::to(
                &locale.url(&format!("/checkout/success/{}", order.id)),
            ))
        }
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
        Err(e) => {
            flash_api_error(&session, &i18n, &e).await?;
            Ok(Redirect::to(&back))
        }
    }
}

/// Display the confirmation for a just-placed order.
#[instrument(skip(state, auth, ctx))]
pub async fn success(
    State(state): State<AppState>,
    RequireAuth { auth, .. }: RequireAuth,
    ctx: PageContext,
    Path(order_id): Path<String>,
) -> Result<Response> {
    let order = state
        .api(ctx.locale)
        .get_order(&OrderId::new(order_id), &auth)
        .await?;

    Ok(CheckoutSuccessTemplate {
        order: OrderDetailView::new(&order, &ctx.i18n),
        ctx,
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(address_id: Option<&str>) -> CheckoutForm {
        CheckoutForm {
            address_id: address_id.map(String::from),
            payment_method: PaymentMethod::BankTransfer,
            coupon_code: Some(" sale10 ".to_string()),
            note: Some(String::new()),
            address: AddressForm::default(),
        }
    }

    #[test]
    fn test_saved_address_skips_inline_fields() {
        let request = form(Some("a1")).to_request().unwrap();
        assert_eq!(request.address_id, Some(AddressId::new("a1")));
        assert!(request.shipping_address.is_none());
        assert_eq!(request.coupon_code.as_deref(), Some("SALE10"));
        assert_eq!(request.note, None);
    }

    #[test]
    fn test_new_address_is_validated() {
        assert_eq!(
            form(Some(NEW_ADDRESS)).to_request().unwrap_err(),
            "address.error.full_name"
        );
        assert!(form(None).to_request().is_err());
    }
}
