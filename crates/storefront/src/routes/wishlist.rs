//! Wishlist route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use sapa_core::ProductId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::breadcrumbs::Crumb;
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequestLocale, RequireAuth};
use crate::page::{PageContext, flash_result, safe_next};
use crate::state::AppState;
use crate::views::WishlistItemView;

/// Optional locale-less return path posted by the buttons on product pages.
#[derive(Debug, Default, Deserialize)]
pub struct WishlistForm {
    pub next: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "wishlist/index.html")]
pub struct WishlistTemplate {
    pub ctx: PageContext,
    pub crumbs: Vec<Crumb>,
    pub items: Vec<WishlistItemView>,
}

/// Display saved products.
#[instrument(skip(state, auth, ctx))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth { auth, .. }: RequireAuth,
    ctx: PageContext,
) -> Result<Response> {
    let items = state.api(ctx.locale).get_wishlist(&auth).await?;

    Ok(WishlistTemplate {
        crumbs: ctx.breadcrumbs(&[]),
        items: items
            .iter()
            .map(|item| WishlistItemView::new(item, ctx.locale))
            .collect(),
        ctx,
    }
    .into_response())
}

fn back_to(locale: &RequestLocale, form: &WishlistForm) -> Redirect {
    let next = safe_next(form.next.as_deref()).unwrap_or("/wishlist");
    Redirect::to(&locale.url(next))
}

/// Save a product.
#[instrument(skip(state, auth, session, form))]
pub async fn add(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
    Path(product_id): Path<String>,
    Form(form): Form<WishlistForm>,
) -> Result<Redirect> {
    let result = state
        .api(locale.locale)
        .add_to_wishlist(&ProductId::new(product_id), &auth)
        .await;
    flash_result(&session, &locale.i18n(), result, "wishlist.added").await?;
    Ok(back_to(&locale, &form))
}

/// Remove a saved product.
#[instrument(skip(state, auth, session, form))]
pub async fn remove(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
    Path(product_id): Path<String>,
    Form(form): Form<WishlistForm>,
) -> Result<Redirect> {
    let result = state
        .api(locale.locale)
        .remove_from_wishlist(&ProductId::new(product_id), &auth)
        .await;
    flash_result(&session, &locale.i18n(), result, "wishlist.removed").await?;
    Ok(back_to(&locale, &form))
}
