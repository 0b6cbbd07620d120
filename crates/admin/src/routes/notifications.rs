//! The operator's notification inbox.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use sapa_api::ApiError;
use sapa_api::types::Notification;
use sapa_core::{Locale, NotificationId, NotificationKind, PageRequest};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::page::{AdminPage, Pagination, flash_result, safe_next};
use crate::state::AppState;
use crate::views::format_datetime;

const PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct NotificationView {
    pub id: String,
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
    /// Same-site target opened after marking read.
    pub link: Option<String>,
}

impl NotificationView {
    #[must_use]
    pub fn new(notification: &Notification, locale: Locale) -> Self {
        Self {
            id: notification.id.to_string(),
            kind: kind_label(notification.kind),
            title: notification.title.clone(),
            message: notification.message.clone(),
            is_read: notification.is_read,
            created_at: format_datetime(&notification.created_at, locale),
            link: safe_next(notification.link.as_deref()).map(String::from),
        }
    }
}

const fn kind_label(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Order => "Order",
        NotificationKind::Promotion => "Promotion",
        NotificationKind::System => "System",
        NotificationKind::Review => "Review",
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "notifications/index.html")]
pub struct NotificationsTemplate {
    pub page: AdminPage,
    pub notifications: Vec<NotificationView>,
    pub unread: u64,
    pub pagination: Option<Pagination>,
}

#[instrument(skip(state, auth, page))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    page: AdminPage,
    Query(query): Query<NotificationsQuery>,
) -> Result<NotificationsTemplate> {
    let api = state.api();
    let (notifications, unread) = tokio::join!(
        api.list_notifications(PageRequest::new(query.page, Some(PAGE_SIZE)), &auth),
        api.unread_count(&auth),
    );
    let notifications = notifications?;
    let locale = state.locale();
    Ok(NotificationsTemplate {
        page,
        notifications: notifications
            .items
            .iter()
            .map(|n| NotificationView::new(n, locale))
            .collect(),
        unread: unread.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load unread count");
            0
        }),
        pagination: Pagination::new(&notifications, "/notifications"),
    })
}

#[derive(Debug, Deserialize)]
pub struct ReadForm {
    pub next: Option<String>,
}

/// Mark one notification read, then follow its link if it has one.
#[instrument(skip(state, auth, form))]
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    Path(id): Path<String>,
    axum::Form(form): axum::Form<ReadForm>,
) -> Result<Redirect> {
    let result = state
        .api()
        .mark_read(&NotificationId::new(id.as_str()), &auth)
        .await;
    match result {
        Ok(()) => {}
        Err(ApiError::Unauthorized) => return Err(AppError::Api(ApiError::Unauthorized)),
        Err(e) => tracing::warn!(error = %e, notification_id = %id, "Failed to mark notification read"),
    }
    Ok(Redirect::to(
        safe_next(form.next.as_deref()).unwrap_or("/notifications"),
    ))
}

#[instrument(skip(state, auth, session))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
) -> Result<Redirect> {
    let result = state.api().mark_all_read(&auth).await;
    flash_result(&session, result, "All notifications marked as read.").await?;
    Ok(Redirect::to("/notifications"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_view_drops_offsite_links() {
        let mut notification = Notification {
            id: NotificationId::new("n1"),
            kind: NotificationKind::Order,
            title: "Đơn hàng mới".to_string(),
            message: "SP-1002".to_string(),
            link: Some("https://evil.example/orders".to_string()),
            is_read: false,
            created_at: Utc::now(),
        };
        assert_eq!(NotificationView::new(&notification, Locale::En).link, None);

        notification.link = Some("/orders/o2".to_string());
        let view = NotificationView::new(&notification, Locale::En);
        assert_eq!(view.link.as_deref(), Some("/orders/o2"));
        assert_eq!(view.kind, "Order");
    }
}
