//! Customer and staff account management.
//!
//! An admin cannot demote, deactivate or delete their own account, so the
//! console always keeps at least the operator who is using it.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use sapa_api::ApiError;
use sapa_api::types::{OrderQuery, User, UserQuery, UserUpdate};
use sapa_core::{Locale, PageRequest, UserId, UserRole};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::components::DataTableConfig;
use crate::components::data_table::users_table_config;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::models::{CurrentAdmin, FlashKind, push_flash};
use crate::page::{AdminPage, Pagination, flash_result, non_empty, with_query};
use crate::routes::orders::OrderRowView;
use crate::state::AppState;
use crate::views::format_datetime;

const PAGE_SIZE: u32 = 20;
const RECENT_ORDERS: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub page: Option<u32>,
    pub search: Option<String>,
    pub role: Option<String>,
}

impl UsersQuery {
    #[must_use]
    pub fn role(&self) -> Option<UserRole> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct ActiveForm {
    pub active: String,
}

#[derive(Debug, Clone)]
pub struct UserRowView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub is_admin: bool,
    pub is_active: bool,
    pub order_count: u32,
    pub joined: String,
    pub href: String,
}

impl UserRowView {
    #[must_use]
    pub fn new(user: &User, locale: Locale) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            is_admin: user.is_admin(),
            is_active: user.is_active,
            order_count: user.order_count.unwrap_or(0),
            joined: user
                .created_at
                .as_ref()
                .map(|at| format_datetime(at, locale))
                .unwrap_or_default(),
            href: format!("/users/{}", user.id),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "users/index.html")]
pub struct UsersIndexTemplate {
    pub page: AdminPage,
    pub table: DataTableConfig,
    pub users: Vec<UserRowView>,
    pub pagination: Option<Pagination>,
}

#[derive(Template, WebTemplate)]
#[template(path = "users/show.html")]
pub struct UserShowTemplate {
    pub page: AdminPage,
    pub user: UserRowView,
    pub orders: Vec<OrderRowView>,
    /// `true` when viewing your own account; hides destructive actions.
    pub is_self: bool,
    pub email_enabled: bool,
}

/// `Err` with a message when `admin` may not apply this change to `target`.
fn guard_self(admin: &CurrentAdmin, target: &UserId, update: &UserUpdate) -> std::result::Result<(), String> {
    if &admin.id != target {
        return Ok(());
    }
    if update.role.is_some_and(|r| r != UserRole::Admin) {
        return Err("You cannot remove your own admin role.".to_string());
    }
    if update.is_active == Some(false) {
        return Err("You cannot deactivate your own account.".to_string());
    }
    Ok(())
}

#[instrument(skip(state, auth, page))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    page: AdminPage,
    Query(query): Query<UsersQuery>,
) -> Result<UsersIndexTemplate> {
    let role = query.role();
    let search = non_empty(query.search.as_deref());
    let users = state
        .api()
        .list_users(
            &UserQuery {
                page: PageRequest::new(query.page, Some(PAGE_SIZE)),
                search: search.clone(),
                role,
            },
            &auth,
        )
        .await?;

    let role_value = role.map(|r| r.to_string());
    let base = with_query(
        "/users",
        &[("role", role_value.as_deref()), ("search", search.as_deref())],
    );
    let locale = state.locale();
    Ok(UsersIndexTemplate {
        page,
        table: users_table_config(role, search.as_deref()),
        users: users.items.iter().map(|u| UserRowView::new(u, locale)).collect(),
        pagination: Pagination::new(&users, &base),
    })
}

/// Account detail with the customer's latest orders.
#[instrument(skip(state, admin, auth, page))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth { admin, auth }: RequireAdminAuth,
    page: AdminPage,
    Path(id): Path<String>,
) -> Result<UserShowTemplate> {
    let api = state.api();
    let user = api.get_user(&UserId::new(id.as_str()), &auth).await?;
    let orders = match api
        .list_orders(
            &OrderQuery {
                page: PageRequest::new(Some(1), Some(RECENT_ORDERS)),
                search: Some(user.email.clone()),
                ..OrderQuery::default()
            },
            &auth,
        )
        .await
    {
        Ok(orders) => orders.items,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load orders for user");
            Vec::new()
        }
    };
    let locale = state.locale();
    Ok(UserShowTemplate {
        page,
        is_self: admin.id == user.id,
        user: UserRowView::new(&user, locale),
        orders: orders.iter().map(|o| OrderRowView::new(o, locale)).collect(),
        email_enabled: state.email().is_enabled(),
    })
}

async fn apply_update(
    state: &AppState,
    RequireAdminAuth { admin, auth }: &RequireAdminAuth,
    session: &Session,
    id: &str,
    update: UserUpdate,
    success: &str,
) -> Result<Redirect> {
    let user_id = UserId::new(id);
    if let Err(message) = guard_self(admin, &user_id, &update) {
        push_flash(session, FlashKind::Error, message).await?;
        return Ok(Redirect::to(&format!("/users/{id}")));
    }
    let result = state.api().update_user(&user_id, &update, auth).await;
    if let Some(user) = flash_result(session, result, success).await? {
        add_breadcrumb("users", success, &[("user_id", id)]);
        tracing::info!(user_id = %user.id, role = %user.role, is_active = user.is_active, "User updated");
    }
    Ok(Redirect::to(&format!("/users/{id}")))
}

#[instrument(skip(state, require, session, form))]
pub async fn update_role(
    State(state): State<AppState>,
    require: RequireAdminAuth,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<RoleForm>,
) -> Result<Redirect> {
    let Ok(role) = form.role.parse::<UserRole>() else {
        push_flash(&session, FlashKind::Error, "Unknown role.").await?;
        return Ok(Redirect::to(&format!("/users/{id}")));
    };
    let update = UserUpdate {
        role: Some(role),
        ..UserUpdate::default()
    };
    apply_update(&state, &require, &session, &id, update, "Role updated.").await
}

#[instrument(skip(state, require, session, form))]
pub async fn set_active(
    State(state): State<AppState>,
    require: RequireAdminAuth,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<ActiveForm>,
) -> Result<Redirect> {
    let active = form.active == "true";
    let update = UserUpdate {
        is_active: Some(active),
        ..UserUpdate::default()
    };
    let message = if active {
        "Account activated."
    } else {
        "Account deactivated."
    };
    apply_update(&state, &require, &session, &id, update, message).await
}

#[instrument(skip(state, admin, auth, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth { admin, auth }: RequireAdminAuth,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let user_id = UserId::new(id.as_str());
    if admin.id == user_id {
        push_flash(&session, FlashKind::Error, "You cannot delete your own account.").await?;
        return Ok(Redirect::to(&format!("/users/{id}")));
    }
    let result = state.api().delete_user(&user_id, &auth).await;
    if flash_result(&session, result, "User deleted.").await?.is_some() {
        add_breadcrumb("users", "User deleted", &[("user_id", &id)]);
        tracing::info!(user_id = %id, "User deleted");
        return Ok(Redirect::to("/users"));
    }
    Ok(Redirect::to(&format!("/users/{id}")))
}

/// Re-send the welcome email.
#[instrument(skip(state, auth, session))]
pub async fn send_welcome(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let api = state.api();
    let user = match api.get_user(&UserId::new(id.as_str()), &auth).await {
        Ok(user) => user,
        Err(ApiError::Unauthorized) => return Err(AppError::Api(ApiError::Unauthorized)),
        Err(e) => {
            push_flash(&session, FlashKind::Error, e.user_message()).await?;
            return Ok(Redirect::to("/users"));
        }
    };
    let store_name = api
        .get_settings()
        .await
        .map(|s| s.store_name)
        .unwrap_or_else(|_| sapa_api::types::Settings::default().store_name);

    match state
        .email()
        .send_welcome(&user.email, &user.name, &store_name, &state.config().storefront_url)
        .await
    {
        Ok(()) => {
            tracing::info!(user_id = %user.id, "Welcome email sent");
            push_flash(&session, FlashKind::Success, format!("Emailed {}.", user.email)).await?;
        }
        Err(e) => {
            tracing::error!(error = %e, user_id = %user.id, "Failed to send welcome email");
            push_flash(&session, FlashKind::Error, "The email could not be sent.").await?;
        }
    }
    Ok(Redirect::to(&format!("/users/{id}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn admin() -> CurrentAdmin {
        CurrentAdmin {
            id: UserId::new("u-admin"),
            email: "admin@sapa.vn".to_string(),
            name: "Admin".to_string(),
        }
    }

    #[test]
    fn test_guard_self_blocks_own_demotion() {
        let demote = UserUpdate {
            role: Some(UserRole::Customer),
            ..UserUpdate::default()
        };
        assert!(guard_self(&admin(), &UserId::new("u-admin"), &demote).is_err());
        assert!(guard_self(&admin(), &UserId::new("u-2"), &demote).is_ok());

        let deactivate = UserUpdate {
            is_active: Some(false),
            ..UserUpdate::default()
        };
        assert!(guard_self(&admin(), &UserId::new("u-admin"), &deactivate).is_err());

        let activate = UserUpdate {
            is_active: Some(true),
            ..UserUpdate::default()
        };
        assert!(guard_self(&admin(), &UserId::new("u-admin"), &activate).is_ok());
    }

    #[test]
    fn test_role_filter_ignores_unknown() {
        let query = UsersQuery {
            page: None,
            search: None,
            role: Some("admin".to_string()),
        };
        assert_eq!(query.role(), Some(UserRole::Admin));
        let query = UsersQuery {
            page: None,
            search: None,
            role: Some("owner".to_string()),
        };
        assert_eq!(query.role(), None);
    }
}
