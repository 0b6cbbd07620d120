//! Review moderation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use sapa_api::types::{Review, ReviewQuery};
use sapa_core::{Locale, PageRequest, ProductId, ReviewId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::components::DataTableConfig;
use crate::components::data_table::reviews_table_config;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::page::{AdminPage, Pagination, flash_result, non_empty, safe_next, with_query};
use crate::state::AppState;
use crate::views::format_datetime;

const PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct ReviewsQuery {
    pub page: Option<u32>,
    pub visible: Option<String>,
    pub product_id: Option<String>,
}

impl ReviewsQuery {
    /// Unknown values mean "all".
    #[must_use]
    pub fn visible(&self) -> Option<bool> {
        self.visible.as_deref().and_then(|v| v.parse().ok())
    }
}

#[derive(Debug, Deserialize)]
pub struct VisibilityForm {
    pub visible: String,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnForm {
    pub next: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReviewRowView {
    pub id: String,
    pub product: String,
    pub product_href: String,
    pub author: String,
    pub stars: String,
    pub comment: String,
    pub is_visible: bool,
    pub created_at: String,
}

impl ReviewRowView {
    #[must_use]
    pub fn new(review: &Review, locale: Locale) -> Self {
        let filled = usize::from(review.rating.min(5));
        Self {
            id: review.id.to_string(),
            product: review
                .product_name
                .clone()
                .unwrap_or_else(|| review.product_id.to_string()),
            product_href: format!("/products/{}/edit", review.product_id),
            author: review.user_name.clone(),
            stars: format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled)),
            comment: review.comment.clone(),
            is_visible: review.is_visible,
            created_at: format_datetime(&review.created_at, locale),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "reviews/index.html")]
pub struct ReviewsTemplate {
    pub page: AdminPage,
    pub table: DataTableConfig,
    pub reviews: Vec<ReviewRowView>,
    pub pagination: Option<Pagination>,
    /// Where row actions return to.
    pub return_to: String,
}

#[instrument(skip(state, auth, page))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    page: AdminPage,
    Query(query): Query<ReviewsQuery>,
) -> Result<ReviewsTemplate> {
    let visible = query.visible();
    let product_id = non_empty(query.product_id.as_deref());
    let reviews = state
        .api()
        .list_reviews(
            &ReviewQuery {
                page: PageRequest::new(query.page, Some(PAGE_SIZE)),
                product_id: product_id.clone().map(ProductId::new),
                visible,
            },
            &auth,
        )
        .await?;

    let visible_value = visible.map(|v| v.to_string());
    let base = with_query(
        "/reviews",
        &[
            ("visible", visible_value.as_deref()),
            ("product_id", product_id.as_deref()),
        ],
    );
    let locale = state.locale();
    Ok(ReviewsTemplate {
        return_to: page.current_path.clone(),
        page,
        table: reviews_table_config(visible),
        reviews: reviews.items.iter().map(|r| ReviewRowView::new(r, locale)).collect(),
        pagination: Pagination::new(&reviews, &base),
    })
}

/// Hide or show one review.
#[instrument(skip(state, auth, session, form))]
pub async fn set_visibility(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<VisibilityForm>,
) -> Result<Redirect> {
    let visible = form.visible == "true";
    let result = state
        .api()
        .set_review_visibility(&ReviewId::new(id.as_str()), visible, &auth)
        .await;
    let message = if visible { "Review shown." } else { "Review hidden." };
    if flash_result(&session, result, message).await?.is_some() {
        tracing::info!(review_id = %id, visible, "Review visibility changed");
    }
    Ok(Redirect::to(safe_next(form.next.as_deref()).unwrap_or("/reviews")))
}

#[instrument(skip(state, auth, session, form))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<ReturnForm>,
) -> Result<Redirect> {
    let result = state
        .api()
        .delete_review(&ReviewId::new(id.as_str()), &auth)
        .await;
    if flash_result(&session, result, "Review deleted.").await?.is_some() {
        tracing::info!(review_id = %id, "Review deleted");
    }
    Ok(Redirect::to(safe_next(form.next.as_deref()).unwrap_or("/reviews")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_visible_filter_parsing() {
        let query = |v: Option<&str>| ReviewsQuery {
            page: None,
            visible: v.map(String::from),
            product_id: None,
        };
        assert_eq!(query(Some("false")).visible(), Some(false));
        assert_eq!(query(Some("true")).visible(), Some(true));
        assert_eq!(query(Some("")).visible(), None);
        assert_eq!(query(None).visible(), None);
    }

    #[test]
    fn test_row_view() {
        let review = Review {
            id: ReviewId::new("r1"),
            product_id: ProductId::new("p1"),
            product_name: None,
            user_name: "Minh".to_string(),
            rating: 4,
            comment: "Vải đẹp".to_string(),
            is_visible: false,
            created_at: Utc.with_ymd_and_hms(2026, 5, 1, 3, 0, 0).unwrap(),
        };
        let row = ReviewRowView::new(&review, Locale::Vi);
        assert_eq!(row.stars, "★★★★☆");
        assert_eq!(row.product, "p1");
        assert_eq!(row.created_at, "01/05/2026 10:00");
        assert!(!row.is_visible);
    }
}
