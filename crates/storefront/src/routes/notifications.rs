//! Notification route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use sapa_core::{NotificationId, PageRequest};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::breadcrumbs::Crumb;
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequestLocale, RequireAuth};
use crate::page::{PageContext, Pagination, flash_api_error, flash_result};
use crate::state::AppState;
use crate::views::NotificationView;

const PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    pub page: Option<u32>,
}

#[derive(Template, WebTemplate)]
#[template(path = "notifications/index.html")]
pub struct NotificationsTemplate {
    pub ctx: PageContext,
    pub crumbs: Vec<Crumb>,
    pub notifications: Vec<NotificationView>,
    pub unread: usize,
    pub pagination: Option<Pagination>,
}

#[instrument(skip(state, auth, ctx))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth { auth, .. }: RequireAuth,
    ctx: PageContext,
    Query(query): Query<NotificationsQuery>,
) -> Result<Response> {
    let page = state
        .api(ctx.locale)
        .list_notifications(PageRequest::new(query.page, Some(PAGE_SIZE)), &auth)
        .await?;
    let notifications: Vec<NotificationView> = page
        .items
        .iter()
        .map(|n| NotificationView::new(n, ctx.locale))
        .collect();

    Ok(NotificationsTemplate {
        crumbs: ctx.breadcrumbs(&[]),
        unread: notifications.iter().filter(|n| !n.is_read).count(),
        pagination: Pagination::new(&page, &ctx.url("/notifications"), &ctx.i18n),
        notifications,
        ctx,
    }
    .into_response())
}

/// Mark one notification read.
#[instrument(skip(state, auth, session))]
pub async fn read(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    if let Err(e) = state
        .api(locale.locale)
        .mark_read(&NotificationId::new(id), &auth)
        .await
    {
        if matches!(e, sapa_api::ApiError::Unauthorized) {
            return Err(e.into());
        }
        flash_api_error(&session, &locale.i18n(), &e).await?;
    }
    Ok(Redirect::to(&locale.url("/notifications")))
}

/// Mark everything read.
#[instrument(skip(state, auth, session))]
pub async fn read_all(
    State(state): State<AppState>,
    locale: RequestLocale,
    RequireAuth { auth, .. }: RequireAuth,
    session: Session,
) -> Result<Redirect> {
    let result = state.api(locale.locale).mark_all_read(&auth).await;
    flash_result(&session, &locale.i18n(), result, "notifications.all_read").await?;
    Ok(Redirect::to(&locale.url("/notifications")))
}
