//! Cart route handlers.
//!
//! The cart lives in the API, keyed by the customer's access token, so
//! every cart route requires a login. Mutations follow post-redirect-get
//! with a flash; HTMX requests get `204` plus an `HX-Trigger: cart-updated`
//! header so the badge refreshes in place.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use sapa_api::types::AddToCart;
use sapa_core::{CartItemId, ProductId, VariantId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::breadcrumbs::Crumb;
use crate::error::Result;
use crate::filters;
use crate::middleware::{OptionalAuth, RequestLocale, RequireAuth};
use crate::models::{FlashKind, push_flash};
use crate::page::{PageContext, api_error_message, flash_result, is_htmx, safe_next};
use crate::state::AppState;
use crate::views::CartView;

/// Event name listened for by `static/js/cart.js`.
pub const CART_UPDATED_EVENT: &str = "cart-updated";

/// Largest quantity accepted from the add form.
const MAX_ADD_QUANTITY: u32 = 99;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: Option<u32>,
    /// Page to return to; defaults to the cart.
    pub next: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub quantity: u32,
}

/// Coupon form data.
#[derive(Debug, Deserialize)]
pub struct CouponForm {
    pub code: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub ctx: PageContext,
    pub crumbs: Vec<Crumb>,
    pub cart: Option<CartView>,
    pub error: Option<String>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Display cart page.
#[instrument(skip(state, auth, ctx))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth { auth, .. }: RequireAuth,
    ctx: PageContext,
) -> Result<Response> {
    let (cart, error) = match state.api(ctx.locale).get_cart(&auth).await {
        Ok(cart) => (Some(CartView::new(&cart, ctx.locale)), None),
        Err(sapa_api::ApiError::Unauthorized) => {
            return Err(sapa_api::ApiError::Unauthorized.into());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch cart");
            (None, Some(api_error_message(&ctx.i18n, &e)))
        }
    };

    Ok(CartShowTemplate {
        crumbs: ctx.breadcrumbs(&[]),
        cart,
        error,
        ctx,
    }
    .into_response())
}

/// Add item to cart.
#[instrument(skip(state, auth, session, headers, form), fields(product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let i18n = locale.i18n();
    let item = AddToCart {
        product_id: ProductId::new(form.product_id),
        variant_id: form
            .variant_id
            .filter(|v| !v.is_empty())
            .map(VariantId::new),
        quantity: form.quantity.unwrap_or(1).clamp(1, MAX_ADD_QUANTITY),
    };
    let result = state.api(locale.locale).add_to_cart(&item, &auth).await;

    if is_htmx(&headers) {
        return Ok(match result {
            Ok(_) => (
                StatusCode::NO_CONTENT,
                AppendHeaders([("HX-Trigger", CART_UPDATED_EVENT)]),
            )
                .into_response(),
            Err(sapa_api::ApiError::Unauthorized) => {
                return Err(sapa_api::ApiError::Unauthorized.into());
            }
            Err(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                api_error_message(&i18n, &e),
            )
                .into_response(),
        });
    }

    flash_result(&session, &i18n, result, "cart.added").await?;
    let next = safe_next(form.next.as_deref()).unwrap_or("/cart");
    Ok(Redirect::to(&locale.url(next)).into_response())
}

/// Change the quantity of a line; zero removes it.
#[instrument(skip(state, auth, session))]
pub async fn update(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
    Path(item_id): Path<String>,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect> {
    let i18n = locale.i18n();
    let api = state.api(locale.locale);
    let item_id = CartItemId::new(item_id);

    if form.quantity == 0 {
        let result = api.remove_cart_item(&item_id, &auth).await;
        flash_result(&session, &i18n, result, "cart.removed").await?;
    } else {
        let result = api.update_cart_item(&item_id, form.quantity, &auth).await;
        flash_result(&session, &i18n, result, "cart.updated").await?;
    }
    Ok(Redirect::to(&locale.url("/cart")))
}

/// Remove a line from the cart.
#[instrument(skip(state, auth, session))]
pub async fn remove(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
    Path(item_id): Path<String>,
) -> Result<Redirect> {
    let result = state
        .api(locale.locale)
        .remove_cart_item(&CartItemId::new(item_id), &auth)
        .await;
    flash_result(&session, &locale.i18n(), result, "cart.removed").await?;
    Ok(Redirect::to(&locale.url("/cart")))
}

/// Empty the cart.
#[instrument(skip(state, auth, session))]
pub async fn clear(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
) -> Result<Redirect> {
    let result = state.api(locale.locale).clear_cart(&auth).await;
    flash_result(&session, &locale.i18n(), result, "cart.cleared").await?;
    Ok(Redirect::to(&locale.url("/cart")))
}

/// Apply a coupon code. The API validates it and reprices the cart.
#[instrument(skip(state, auth, session, form))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
    Form(form): Form<CouponForm>,
) -> Result<Redirect> {
    let i18n = locale.i18n();
    let code = form.code.trim().to_uppercase();
    if code.is_empty() {
        push_flash(&session, FlashKind::Error, i18n.t("coupon.empty")).await?;
    } else {
        let result = state.api(locale.locale).apply_coupon(&code, &auth).await;
        flash_result(&session, &i18n, result, "coupon.applied").await?;
    }
    Ok(Redirect::to(&locale.url("/cart")))
}

/// Remove the applied coupon.
#[instrument(skip(state, auth, session))]
pub async fn remove_coupon(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
) -> Result<Redirect> {
    let result = state.api(locale.locale).remove_coupon(&auth).await;
    flash_result(&session, &locale.i18n(), result, "coupon.removed").await?;
    Ok(Redirect::to(&locale.url("/cart")))
}

/// Get cart count badge (HTMX fragment). Anonymous visitors see zero.
#[instrument(skip(state, customer))]
pub async fn count(
    State(state): State<AppState>,
    locale: RequestLocale,
    OptionalAuth(customer): OptionalAuth,
) -> impl IntoResponse {
    let count = match customer {
        Some(RequireAuth { auth, .. }) => state
            .api(locale.locale)
            .get_cart(&auth)
            .await
            .map(|cart| cart.item_count())
            .unwrap_or_else(|e| {
                tracing::debug!(error = %e, "Cart count unavailable");
                0
            }),
        None => 0,
    };

    CartCountTemplate { count }
}
