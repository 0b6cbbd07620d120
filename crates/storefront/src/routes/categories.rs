//! Category route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use sapa_api::ApiError;
use tracing::instrument;

use crate::breadcrumbs::Crumb;
use crate::error::{AppError, Result};
use crate::filters;
use crate::page::{PageContext, Pagination, api_error_message};
use crate::routes::products::ListingQuery;
use crate::state::AppState;
use crate::views::{CategoryView, ProductCardView};

/// Category listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/index.html")]
pub struct CategoriesIndexTemplate {
    pub ctx: PageContext,
    pub crumbs: Vec<Crumb>,
    pub categories: Vec<CategoryView>,
    pub error: Option<String>,
}

/// Category detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/show.html")]
pub struct CategoryShowTemplate {
    pub ctx: PageContext,
    pub crumbs: Vec<Crumb>,
    pub category: CategoryView,
    pub subcategories: Vec<CategoryView>,
    pub products: Vec<ProductCardView>,
    pub pagination: Option<Pagination>,
    pub error: Option<String>,
}

/// Display all categories.
#[instrument(skip(state, ctx))]
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    let (categories, error) = match state.api(ctx.locale).list_categories().await {
        Ok(list) => (
            list.iter().map(|c| CategoryView::new(c, ctx.locale)).collect(),
            None,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list categories");
            (Vec::new(), Some(api_error_message(&ctx.i18n, &e)))
        }
    };

    CategoriesIndexTemplate {
        crumbs: ctx.breadcrumbs(&[]),
        categories,
        error,
        ctx,
    }
}

/// Display one category with its products.
#[instrument(skip(state, ctx, query))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(slug): Path<String>,
    Query(mut query): Query<ListingQuery>,
) -> Result<Response> {
    let api = state.api(ctx.locale);
    let category = match api.get_category(&slug).await {
        Ok(category) => category,
        Err(ApiError::NotFound(_)) => return Err(AppError::NotFound(format!("category {slug}"))),
        Err(e) => return Err(e.into()),
    };

    query.category = Some(category.slug.clone());
    let api_query = query.to_api();
    let (products, all_categories) =
        tokio::join!(api.list_products(&api_query), api.list_categories());

    let base = ctx.url(&format!("/categories/{slug}"));
    let (cards, pagination, error) = match products {
        Ok(page) => (
            page.items
                .iter()
                .map(|p| ProductCardView::new(p, ctx.locale))
                .collect(),
            Pagination::new(&page, &base, &ctx.i18n),
            None,
        ),
        Err(e) => {
            tracing::warn!(error = %e, category = %slug, "Failed to list category products");
            (Vec::new(), None, Some(api_error_message(&ctx.i18n, &e)))
        }
    };

    let subcategories = all_categories
        .unwrap_or_default()
        .iter()
        .filter(|c| c.parent_id.as_ref() == Some(&category.id))
        .map(|c| CategoryView::new(c, ctx.locale))
        .collect();

    Ok(CategoryShowTemplate {
        crumbs: ctx.breadcrumbs(&[(slug.as_str(), category.name.as_str())]),
        category: CategoryView::new(&category, ctx.locale),
        subcategories,
        products: cards,
        pagination,
        error,
        ctx,
    }
    .into_response())
}
