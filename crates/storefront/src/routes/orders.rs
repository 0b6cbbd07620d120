//! Order history route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use sapa_core::{OrderId, OrderStatus, PageRequest};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::breadcrumbs::Crumb;
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequestLocale, RequireAuth};
use crate::models::{FlashKind, push_flash};
use crate::page::{PageContext, Pagination, flash_result};
use crate::state::AppState;
use crate::views::{OrderDetailView, OrderSummaryView};

const PAGE_SIZE: u32 = 10;

/// Longest reason accepted for a cancellation or refund request.
pub const MAX_REASON_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub page: Option<u32>,
}

/// Cancellation or refund request form.
#[derive(Debug, Deserialize)]
pub struct ReasonForm {
    #[serde(default)]
    pub reason: String,
}

impl ReasonForm {
    /// The trimmed reason, or the translation key of what is wrong with it.
    fn validated(&self) -> std::result::Result<&str, &'static str> {
        let reason = self.reason.trim();
        if reason.is_empty() {
            Err("order.error.reason_required")
        } else if reason.chars().count() > MAX_REASON_LENGTH {
            Err("order.error.reason_too_long")
        } else {
            Ok(reason)
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub ctx: PageContext,
    pub crumbs: Vec<Crumb>,
    pub orders: Vec<OrderSummaryView>,
    pub pagination: Option<Pagination>,
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub ctx: PageContext,
    pub crumbs: Vec<Crumb>,
    pub order: OrderDetailView,
    pub max_reason_length: usize,
}

/// The customer's orders, newest first.
#[instrument(skip(state, auth, ctx))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth { auth, .. }: RequireAuth,
    ctx: PageContext,
    Query(query): Query<OrdersQuery>,
) -> Result<Response> {
    let page = state
        .api(ctx.locale)
        .my_orders(PageRequest::new(query.page, Some(PAGE_SIZE)), &auth)
        .await?;

    Ok(OrdersIndexTemplate {
        crumbs: ctx.breadcrumbs(&[]),
        orders: page
            .items
            .iter()
            .map(|o| OrderSummaryView::new(o, &ctx.i18n))
            .collect(),
        pagination: Pagination::new(&page, &ctx.url("/orders"), &ctx.i18n),
        ctx,
    }
    .into_response())
}

/// One order with its lines and status history.
#[instrument(skip(state, auth, ctx))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth { auth, .. }: RequireAuth,
    ctx: PageContext,
    Path(id): Path<String>,
) -> Result<Response> {
    let order = state
        .api(ctx.locale)
        .get_order(&OrderId::new(id.as_str()), &auth)
        .await?;
    let number = format!("#{}", order.order_number);

    Ok(OrderShowTemplate {
        crumbs: ctx.breadcrumbs(&[(id.as_str(), number.as_str())]),
        order: OrderDetailView::new(&order, &ctx.i18n),
        max_reason_length: MAX_REASON_LENGTH,
        ctx,
    }
    .into_response())
}

/// Which request the customer is making.
#[derive(Debug, Clone, Copy)]
enum OrderRequest {
    Cancellation,
    Refund,
}

impl OrderRequest {
    const fn allowed_from(self, status: OrderStatus) -> bool {
        match self {
            Self::Cancellation => status.customer_can_request_cancellation(),
            Self::Refund => status.customer_can_request_refund(),
        }
    }

    const fn ineligible_key(self) -> &'static str {
        match self {
            Self::Cancellation => "order.error.not_cancellable",
            Self::Refund => "order.error.not_refundable",
        }
    }
}

async fn submit_request(
    state: &AppState,
    locale: &RequestLocale,
    auth: &sapa_api::AuthSession,
    session: &Session,
    id: &str,
    form: &ReasonForm,
    kind: OrderRequest,
) -> Result<Redirect> {
    let i18n = locale.i18n();
    let back = Redirect::to(&locale.url(&format!("/orders/{id}")));

    let reason = match form.validated() {
        Ok(reason) => reason,
        Err(key) => {
            push_flash(session, FlashKind::Error, i18n.t(key)).await?;
            return Ok(back);
        }
    };

    let api = state.api(locale.locale);
    let order_id = OrderId::new(id);
    let current = api.get_order(&order_id, auth).await?;
    if !kind.allowed_from(current.status) {
        tracing::debug!(order_id = %current.id, status = ?current.status, request = ?kind, "Order request not allowed");
        push_flash(session, FlashKind::Error, i18n.t(kind.ineligible_key())).await?;
        return Ok(back);
    }

    let (result, success_key) = match kind {
        OrderRequest::Cancellation => (
            api.request_cancellation(&order_id, reason, auth).await,
            "order.cancellation_requested",
        ),
        OrderRequest::Refund => (
            api.request_refund(&order_id, reason, auth).await,
            "order.refund_requested",
        ),
    };

    if let Some(order) = flash_result(session, &i18n, result, success_key).await? {
        tracing::info!(order_id = %order.id, status = ?order.status, request = ?kind, "Order request submitted");
    }
    Ok(back)
}

/// Ask for a pending or processing order to be cancelled.
#[instrument(skip(state, auth, session, form))]
pub async fn cancel(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<ReasonForm>,
) -> Result<Redirect> {
    submit_request(&state, &locale, &auth, &session, &id, &form, OrderRequest::Cancellation).await
}

/// Ask for a refund of a delivered order.
#[instrument(skip(state, auth, session, form))]
pub async fn refund(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<ReasonForm>,
) -> Result<Redirect> {
    submit_request(&state, &locale, &auth, &session, &id, &form, OrderRequest::Refund).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(reason: &str) -> ReasonForm {
        ReasonForm {
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_reason_is_trimmed() {
        assert_eq!(form("  đổi ý  ").validated(), Ok("đổi ý"));
    }

    #[test]
    fn test_blank_reason_rejected() {
        assert_eq!(form("   ").validated(), Err("order.error.reason_required"));
    }

    #[test]
    fn test_requests_follow_customer_transitions() {
        assert!(OrderRequest::Cancellation.allowed_from(OrderStatus::Pending));
        assert!(OrderRequest::Cancellation.allowed_from(OrderStatus::Processing));
        assert!(!OrderRequest::Cancellation.allowed_from(OrderStatus::Shipped));
        assert!(!OrderRequest::Cancellation.allowed_from(OrderStatus::CancellationRequested));
        assert!(OrderRequest::Refund.allowed_from(OrderStatus::Delivered));
        assert!(!OrderRequest::Refund.allowed_from(OrderStatus::Processing));
        assert!(!OrderRequest::Refund.allowed_from(OrderStatus::Refunded));
    }

    #[test]
    fn test_reason_length_counts_characters() {
        let reason = "ư".repeat(MAX_REASON_LENGTH);
        assert!(form(&reason).validated().is_ok());
        let reason = "a".repeat(MAX_REASON_LENGTH + 1);
        assert_eq!(form(&reason).validated(), Err("order.error.reason_too_long"));
    }
}
