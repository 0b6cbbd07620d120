//! Order management route handlers.
//!
//! The API owns the status workflow. The detail page only offers the
//! moves `OrderStatus` allows for an operator, and a posted move is
//! checked against the order's current status before it is sent.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use sapa_api::types::{Order, OrderQuery};
use sapa_core::{Actor, Locale, OrderId, OrderStatus, PageRequest};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::components::DataTableConfig;
use crate::components::data_table::orders_table_config;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::models::{FlashKind, push_flash};
use crate::page::{AdminPage, Pagination, flash_result, non_empty, with_query};
use crate::services::OrderStatusEmail;
use crate::state::AppState;
use crate::views::{
    format_datetime, payment_method_text, payment_status_text, status_class, status_text,
    transition_action,
};

const PAGE_SIZE: u32 = 20;

/// Longest note stored with a status change.
pub const MAX_NOTE_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub page: Option<u32>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl OrdersQuery {
    /// Unknown status values are ignored rather than rejected.
    fn status(&self) -> Option<OrderStatus> {
        self.status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| s.parse().ok())
    }
}

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
    pub note: Option<String>,
    /// Checkbox; present when the customer should be emailed.
    pub notify: Option<String>,
}

/// Row in the orders table and on the dashboard.
#[derive(Debug, Clone)]
pub struct OrderRowView {
    pub id: String,
    pub number: String,
    pub href: String,
    pub customer: String,
    pub status_label: &'static str,
    pub status_class: &'static str,
    pub payment_status: &'static str,
    pub total: String,
    pub item_count: u32,
    pub placed_at: String,
    pub needs_attention: bool,
}

impl OrderRowView {
    #[must_use]
    pub fn new(order: &Order, locale: Locale) -> Self {
        Self {
            id: order.id.to_string(),
            number: order.order_number.clone(),
            href: format!("/orders/{}", order.id),
            customer: order
                .customer
                .as_ref()
                .map(|c| c.name.clone())
                .or_else(|| order.shipping_address.as_ref().map(|a| a.full_name.clone()))
                .unwrap_or_else(|| "Guest".to_string()),
            status_label: status_text(order.status),
            status_class: status_class(order.status),
            payment_status: payment_status_text(order.payment_status),
            total: order.money(order.total).format(locale),
            item_count: order.item_count(),
            placed_at: format_datetime(&order.created_at, locale),
            needs_attention: order.status.needs_attention(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub name: String,
    pub variant_name: Option<String>,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
}

#[derive(Debug, Clone)]
pub struct HistoryEntryView {
    pub label: &'static str,
    pub status_class: &'static str,
    pub note: Option<String>,
    pub at: String,
}

/// A status button on the detail page.
#[derive(Debug, Clone)]
pub struct TransitionButton {
    pub value: &'static str,
    pub label: &'static str,
    pub destructive: bool,
}

#[derive(Debug, Clone)]
pub struct OrderDetailView {
    pub row: OrderRowView,
    pub payment_method: &'static str,
    pub lines: Vec<OrderLineView>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub shipping_fee: String,
    pub coupon_code: Option<String>,
    pub customer_email: Option<String>,
    pub customer_href: Option<String>,
    pub recipient: Option<String>,
    pub shipping_address: Option<String>,
    pub note: Option<String>,
    pub history: Vec<HistoryEntryView>,
    pub transitions: Vec<TransitionButton>,
}

impl OrderDetailView {
    #[must_use]
    pub fn new(order: &Order, locale: Locale) -> Self {
        let fmt = |amount| order.money(amount).format(locale);
        Self {
            row: OrderRowView::new(order, locale),
            payment_method: payment_method_text(order.payment_method),
            lines: order
                .items
                .iter()
                .map(|item| OrderLineView {
                    name: item.name.clone(),
                    variant_name: item.variant_name.clone(),
                    unit_price: fmt(item.unit_price),
                    quantity: item.quantity,
                    line_total: fmt(item.line_total),
                })
                .collect(),
            subtotal: fmt(order.subtotal),
            discount: (!order.discount.is_zero()).then(|| fmt(-order.discount)),
            shipping_fee: fmt(order.shipping_fee),
            coupon_code: order.coupon_code.clone(),
            customer_email: order.customer.as_ref().map(|c| c.email.clone()),
            customer_href: order.customer.as_ref().map(|c| format!("/users/{}", c.id)),
            recipient: order
                .shipping_address
                .as_ref()
                .map(|a| format!("{} · {}", a.full_name, a.phone)),
            shipping_address: order.shipping_address.as_ref().map(|a| a.one_line()),
            note: order.note.clone(),
            history: order
                .history
                .iter()
                .map(|change| HistoryEntryView {
                    label: status_text(change.status),
                    status_class: status_class(change.status),
                    note: change.note.clone(),
                    at: format_datetime(&change.changed_at, locale),
                })
                .collect(),
            transitions: order
                .status
                .transitions_for(Actor::Admin)
                .iter()
                .map(|to| TransitionButton {
                    value: to.as_str(),
                    label: transition_action(order.status, *to),
                    destructive: matches!(to, OrderStatus::Cancelled | OrderStatus::Refunded),
                })
                .collect(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub page: AdminPage,
    pub table: DataTableConfig,
    pub orders: Vec<OrderRowView>,
    pub pagination: Option<Pagination>,
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub page: AdminPage,
    pub order: OrderDetailView,
    pub email_enabled: bool,
    pub max_note_length: usize,
}

/// All orders, filtered by status and search.
#[instrument(skip(state, auth, page))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    page: AdminPage,
    Query(query): Query<OrdersQuery>,
) -> Result<Response> {
    let status = query.status();
    let search = non_empty(query.search.as_deref());
    let orders = state
        .api()
        .list_orders(
            &OrderQuery {
                page: PageRequest::new(query.page, Some(PAGE_SIZE)),
                status,
                search: search.clone(),
            },
            &auth,
        )
        .await?;

    let base = with_query(
        "/orders",
        &[
            ("status", status.map(OrderStatus::as_str)),
            ("search", search.as_deref()),
        ],
    );
    let locale = state.locale();

    Ok(OrdersIndexTemplate {
        page,
        table: orders_table_config(status, search.as_deref()),
        orders: orders
            .items
            .iter()
            .map(|o| OrderRowView::new(o, locale))
            .collect(),
        pagination: Pagination::new(&orders, &base),
    }
    .into_response())
}

/// One order with lines, history and the allowed status moves.
#[instrument(skip(state, auth, page))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    page: AdminPage,
    Path(id): Path<String>,
) -> Result<Response> {
    let order = state.api().get_order(&OrderId::new(id), &auth).await?;

    Ok(OrderShowTemplate {
        page,
        order: OrderDetailView::new(&order, state.locale()),
        email_enabled: state.email().is_enabled(),
        max_note_length: MAX_NOTE_LENGTH,
    }
    .into_response())
}

/// Check a posted move against the order's current status.
///
/// # Errors
///
/// Returns the message to flash when the move is not allowed.
fn validate_move(
    current: OrderStatus,
    form: &StatusForm,
) -> std::result::Result<(OrderStatus, Option<String>), String> {
    let target: OrderStatus = form
        .status
        .parse()
        .map_err(|_| format!("Unknown status: {}", form.status))?;
    current.transition(target, Actor::Admin).map_err(|_| {
        format!(
            "Cannot move an order from {} to {}.",
            status_text(current),
            status_text(target)
        )
    })?;
    let note = non_empty(form.note.as_deref());
    if note
        .as_deref()
        .is_some_and(|n| n.chars().count() > MAX_NOTE_LENGTH)
    {
        return Err(format!("Notes are limited to {MAX_NOTE_LENGTH} characters."));
    }
    Ok((target, note))
}

/// Move an order to a new status, optionally emailing the customer.
#[instrument(skip(state, auth, session, form), fields(status = %form.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdminAuth { auth, admin }: RequireAdminAuth,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let back = Redirect::to(&format!("/orders/{id}"));
    let order_id = OrderId::new(id.as_str());
    let current = state.api().get_order(&order_id, &auth).await?;

    let (target, note) = match validate_move(current.status, &form) {
        Ok(valid) => valid,
        Err(message) => {
            push_flash(&session, FlashKind::Error, message).await?;
            return Ok(back);
        }
    };

    let result = state
        .api()
        .update_order_status(&order_id, target, note.clone(), &auth)
        .await;
    let success = format!("Order #{} is now {}.", current.order_number, status_text(target));
    let Some(order) = flash_result(&session, result, &success).await? else {
        return Ok(back);
    };

    add_breadcrumb(
        "orders",
        "Order status changed",
        &[("order_id", id.as_str()), ("status", target.as_str())],
    );
    tracing::info!(
        order_id = %order.id,
        admin_id = %admin.id,
        from = %current.status,
        to = %order.status,
        "Order status updated"
    );

    if form.notify.is_some() {
        notify_customer(&state, &session, &order, note.as_deref()).await?;
    }

    Ok(back)
}

async fn notify_customer(
    state: &AppState,
    session: &Session,
    order: &Order,
    note: Option<&str>,
) -> Result<()> {
    let Some(customer) = &order.customer else {
        push_flash(session, FlashKind::Error, "This order has no customer email to notify.").await?;
        return Ok(());
    };

    let store_name = match state.api().get_settings().await {
        Ok(settings) => settings.store_name,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load store name for email");
            sapa_api::types::Settings::default().store_name
        }
    };
    let total = order.money(order.total).format(state.locale());
    let email = OrderStatusEmail {
        to: &customer.email,
        customer_name: &customer.name,
        order_number: &order.order_number,
        status: order.status,
        total: &total,
        note,
        store_name: &store_name,
    };

    match state.email().send_order_status_update(&email).await {
        Ok(()) if state.email().is_enabled() => {
            push_flash(session, FlashKind::Success, format!("Emailed {}.", customer.email)).await?;
        }
        Ok(()) => {}
        Err(e) => {
            tracing::warn!(error = %e, order_id = %order.id, "Order status email failed");
            push_flash(
                session,
                FlashKind::Error,
                "The status was saved but the customer email could not be sent.",
            )
            .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(status: &str, note: Option<&str>) -> StatusForm {
        StatusForm {
            status: status.to_string(),
            note: note.map(String::from),
            notify: None,
        }
    }

    fn order() -> Order {
        serde_json::from_str(
            r#"{
                "id": "o1", "orderNumber": "SP-1001", "status": "REFUND_REQUESTED",
                "paymentStatus": "PAID", "paymentMethod": "BANK_TRANSFER",
                "items": [{"productId":"p1","name":"Áo","unitPrice":"100000","quantity":2,"lineTotal":"200000"}],
                "subtotal": "200000", "shippingFee": "30000", "total": "230000",
                "customer": {"id": "u1", "name": "Nguyễn Lan", "email": "lan@sapa.vn"},
                "history": [{"status": "DELIVERED", "changedAt": "2026-03-02T01:00:00Z"}],
                "createdAt": "2026-03-01T08:00:00Z"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_move_follows_workflow() {
        assert_eq!(
            validate_move(OrderStatus::Pending, &form("processing", Some(" ok "))).unwrap(),
            (OrderStatus::Processing, Some("ok".to_string()))
        );
        assert!(validate_move(OrderStatus::Pending, &form("SHIPPED", None)).is_err());
        assert!(validate_move(OrderStatus::Cancelled, &form("PENDING", None)).is_err());
        assert!(validate_move(OrderStatus::Pending, &form("LOST", None)).is_err());
    }

    #[test]
    fn test_validate_move_limits_note() {
        let note = "x".repeat(MAX_NOTE_LENGTH + 1);
        assert!(validate_move(OrderStatus::Pending, &form("CANCELLED", Some(&note))).is_err());
    }

    #[test]
    fn test_detail_view_offers_refund_decisions() {
        let view = OrderDetailView::new(&order(), Locale::Vi);
        let labels: Vec<_> = view.transitions.iter().map(|t| t.label).collect();
        assert_eq!(labels, vec!["Approve refund", "Reject refund"]);
        assert!(view.transitions[0].destructive);
        assert_eq!(view.row.total, "230.000 ₫");
        assert_eq!(view.row.customer, "Nguyễn Lan");
        assert!(view.row.needs_attention);
        assert_eq!(view.customer_href.as_deref(), Some("/users/u1"));
        assert_eq!(view.history.len(), 1);
    }

    #[test]
    fn test_unknown_status_filter_is_ignored() {
        let query = OrdersQuery {
            page: None,
            status: Some("nope".to_string()),
            search: None,
        };
        assert_eq!(query.status(), None);
    }
}
