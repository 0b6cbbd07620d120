//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use sapa_api::types::{ProductQuery, ProductSort};
use sapa_core::PageRequest;
use tracing::instrument;

use crate::filters;
use crate::page::{PageContext, api_error_message};
use crate::state::AppState;
use crate::views::{CategoryView, ProductCardView};

/// Number of products in the "new arrivals" grid.
const FEATURED_COUNT: u32 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub featured: Vec<ProductCardView>,
    pub categories: Vec<CategoryView>,
    /// Set when the catalog could not be loaded.
    pub error: Option<String>,
}

/// Display the home page.
///
/// Catalog failures degrade to an empty page with a notice rather than
/// an error response.
#[instrument(skip(state, ctx))]
pub async fn home(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    let api = state.api(ctx.locale);
    let query = ProductQuery {
        page: PageRequest::new(Some(1), Some(FEATURED_COUNT)),
        sort: Some(ProductSort::Newest),
        ..ProductQuery::default()
    };

    let (products, categories) = tokio::join!(api.list_products(&query), api.list_categories());

    let mut error = None;
    let featured = match products {
        Ok(page) => page
            .items
            .iter()
            .map(|p| ProductCardView::new(p, ctx.locale))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load featured products");
            error = Some(api_error_message(&ctx.i18n, &e));
            Vec::new()
        }
    };
    let categories = match categories {
        Ok(list) => list
            .iter()
            .filter(|c| c.parent_id.is_none())
            .map(|c| CategoryView::new(c, ctx.locale))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load categories");
            Vec::new()
        }
    };

    HomeTemplate {
        ctx,
        featured,
        categories,
        error,
    }
}
