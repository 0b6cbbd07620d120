//! Product route handlers: listing with filters, detail page and reviews.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use sapa_api::{
    ApiError,
    types::{ProductQuery, ProductSort, ReviewInput},
};
use sapa_core::{PageRequest, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::breadcrumbs::Crumb;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{OptionalAuth, RequestLocale, RequireAuth};
use crate::models::{FlashKind, push_flash};
use crate::page::{PageContext, Pagination, api_error_message, flash_result};
use crate::state::AppState;
use crate::views::{CategoryView, ProductCardView, ProductDetailView, ReviewView};

/// Products per listing page.
const PAGE_SIZE: u32 = 12;
const REVIEWS_PAGE_SIZE: u32 = 5;

/// Listing filters as they arrive from the filter form.
///
/// Every field is a string so an empty input means "no filter" instead of
/// a rejected request.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub page: Option<u32>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ListingQuery {
    /// Convert to an API query. Unparseable prices and sorts are ignored.
    #[must_use]
    pub fn to_api(&self) -> ProductQuery {
        let price = |v: Option<&String>| {
            non_empty(v.map(String::as_str)).and_then(|p| Decimal::from_str(p).ok())
        };
        ProductQuery {
            page: PageRequest::new(self.page, Some(PAGE_SIZE)),
            search: non_empty(self.q.as_deref()).map(String::from),
            category: non_empty(self.category.as_deref()).map(String::from),
            sort: non_empty(self.sort.as_deref()).and_then(ProductSort::parse),
            min_price: price(self.min_price.as_ref()),
            max_price: price(self.max_price.as_ref()),
            include_inactive: false,
        }
    }

    /// The active filters as a query string, without `page`.
    #[must_use]
    pub fn filter_query(&self) -> String {
        let pairs: Vec<String> = [
            ("q", self.q.as_deref()),
            ("category", self.category.as_deref()),
            ("sort", self.sort.as_deref()),
            ("min_price", self.min_price.as_deref()),
            ("max_price", self.max_price.as_deref()),
        ]
        .into_iter()
        .filter_map(|(k, v)| non_empty(v).map(|v| format!("{k}={}", urlencoding::encode(v))))
        .collect();
        pairs.join("&")
    }
}

/// One option of the sort dropdown.
pub struct SortOption {
    pub value: &'static str,
    pub label: String,
    pub selected: bool,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub ctx: PageContext,
    pub crumbs: Vec<Crumb>,
    pub heading: String,
    pub products: Vec<ProductCardView>,
    pub categories: Vec<CategoryView>,
    pub sort_options: Vec<SortOption>,
    pub q: String,
    pub category: String,
    pub min_price: String,
    pub max_price: String,
    pub total: u64,
    pub pagination: Option<Pagination>,
    pub error: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub ctx: PageContext,
    pub crumbs: Vec<Crumb>,
    pub product: ProductDetailView,
    pub reviews: Vec<ReviewView>,
    pub reviews_pagination: Option<Pagination>,
    pub in_wishlist: bool,
    pub can_review: bool,
}

/// Display product listing page.
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<ListingQuery>,
) -> impl IntoResponse {
    let api = state.api(ctx.locale);
    let api_query = query.to_api();
    let (products, categories) =
        tokio::join!(api.list_products(&api_query), api.list_categories());

    let categories = categories.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load categories");
        Vec::new()
    });

    let filter = query.filter_query();
    let base = if filter.is_empty() {
        ctx.url("/products")
    } else {
        ctx.url(&format!("/products?{filter}"))
    };

    let (cards, total, pagination, error) = match products {
        Ok(page) => (
            page.items
                .iter()
                .map(|p| ProductCardView::new(p, ctx.locale))
                .collect(),
            page.total,
            Pagination::new(&page, &base, &ctx.i18n),
            None,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list products");
            (Vec::new(), 0, None, Some(api_error_message(&ctx.i18n, &e)))
        }
    };

    let selected_sort = query.sort.as_deref().and_then(ProductSort::parse);
    let sort_options = ProductSort::ALL
        .into_iter()
        .map(|s| SortOption {
            value: s.as_str(),
            label: ctx.t(&format!("products.sort.{}", s.as_str())).to_string(),
            selected: Some(s) == selected_sort,
        })
        .collect();

    let heading = non_empty(query.q.as_deref()).map_or_else(
        || ctx.t("products.title").to_string(),
        |q| ctx.i18n.format("products.search_results", &[("query", &q)]),
    );

    ProductsIndexTemplate {
        crumbs: ctx.breadcrumbs(&[]),
        heading,
        products: cards,
        categories: categories
            .iter()
            .map(|c| CategoryView::new(c, ctx.locale))
            .collect(),
        sort_options,
        q: query.q.clone().unwrap_or_default(),
        category: query.category.clone().unwrap_or_default(),
        min_price: query.min_price.clone().unwrap_or_default(),
        max_price: query.max_price.clone().unwrap_or_default(),
        total,
        pagination,
        error,
        ctx,
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewsQuery {
    pub reviews_page: Option<u32>,
}

/// Display product detail page.
#[instrument(skip(state, ctx, customer, query))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    OptionalAuth(customer): OptionalAuth,
    Path(slug): Path<String>,
    Query(query): Query<ReviewsQuery>,
) -> Result<Response> {
    let api = state.api(ctx.locale);
    let product = match api.get_product(&slug).await {
        Ok(product) if product.is_active => product,
        Ok(_) | Err(ApiError::NotFound(_)) => {
            return Err(AppError::NotFound(format!("product {slug}")));
        }
        Err(e) => return Err(e.into()),
    };

    let page = PageRequest::new(query.reviews_page, Some(REVIEWS_PAGE_SIZE));
    let reviews = api.product_reviews(&product.id, page).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, product_id = %product.id, "Failed to load reviews");
        sapa_core::Page::empty()
    });

    let in_wishlist = match &customer {
        Some(RequireAuth { auth, .. }) => api
            .get_wishlist(auth)
            .await
            .map(|items| items.iter().any(|i| i.product.id == product.id))
            .unwrap_or(false),
        None => false,
    };

    let base = ctx.url(&format!("/products/{slug}"));
    let reviews_pagination = Pagination::with_param(&reviews, &base, "reviews_page", &ctx.i18n);

    let crumbs = ctx.breadcrumbs(&[(slug.as_str(), product.name.as_str())]);
    Ok(ProductShowTemplate {
        crumbs,
        product: ProductDetailView::new(&product, ctx.locale),
        reviews: reviews
            .items
            .iter()
            .map(|r| ReviewView::new(r, ctx.locale))
            .collect(),
        reviews_pagination,
        in_wishlist,
        can_review: customer.is_some(),
        ctx,
    }
    .into_response())
}

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub product_id: String,
    pub rating: u8,
    pub comment: String,
}

/// Submit a review, then return to the product page.
#[instrument(skip(state, session, auth, form), fields(product_id = %form.product_id))]
pub async fn create_review(
    State(state): State<AppState>,
    locale: RequestLocale,
    session: Session,
    RequireAuth { auth, .. }: RequireAuth,
    Path(slug): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect> {
    let i18n = locale.i18n();
    let back = locale.url(&format!("/products/{slug}#reviews"));

    let input = ReviewInput {
        rating: form.rating,
        comment: form.comment.trim().to_string(),
    };
    if !input.has_valid_rating() || input.comment.is_empty() {
        push_flash(&session, FlashKind::Error, i18n.t("reviews.invalid")).await?;
        return Ok(Redirect::to(&back));
    }

    let result = state
        .api(locale.locale)
        .create_review(&ProductId::new(form.product_id), &input, &auth)
        .await;
    flash_result(&session, &i18n, result, "reviews.created").await?;
    Ok(Redirect::to(&back))
}
