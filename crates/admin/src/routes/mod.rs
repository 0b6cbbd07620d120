//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Health check
//! GET  /health/ready                 - Readiness (session store)
//!
//! # Dashboard
//! GET  /                             - Stats, revenue chart, top products
//!
//! # Auth
//! GET/POST /auth/login               - Login (ADMIN role only)
//! POST     /auth/logout              - Logout
//!
//! # Orders
//! GET  /orders                       - Order listing (status, search)
//! GET  /orders/{id}                  - Order detail and status history
//! POST /orders/{id}/status           - Move to the next status
//!
//! # Catalog
//! GET  /products                     - Product listing
//! GET  /products/new                 - New product form
//! POST /products                     - Create product
//! GET  /products/{id}/edit           - Edit product form
//! POST /products/{id}                - Update product
//! POST /products/{id}/delete         - Delete product
//! GET  /categories                   - Category tree
//! GET  /categories/new               - New category form
//! POST /categories                   - Create category
//! GET  /categories/{id}/edit         - Edit category form
//! POST /categories/{id}              - Update category
//! POST /categories/{id}/delete       - Delete category
//! GET  /attributes                   - Attribute list and create form
//! POST /attributes                   - Create attribute
//! POST /attributes/{id}              - Update attribute
//! POST /attributes/{id}/delete       - Delete attribute
//!
//! # Marketing
//! GET  /coupons                      - Coupon listing
//! GET  /coupons/new                  - New coupon form
//! POST /coupons                      - Create coupon
//! GET  /coupons/{id}/edit            - Edit coupon form
//! POST /coupons/{id}                 - Update coupon
//! POST /coupons/{id}/delete          - Delete coupon
//! GET  /reviews                      - Review moderation
//! POST /reviews/{id}/visibility      - Hide or show
//! POST /reviews/{id}/delete          - Delete review
//!
//! # Users
//! GET  /users                        - User listing (role, search)
//! GET  /users/{id}                   - User detail with recent orders
//! POST /users/{id}/role              - Change role
//! POST /users/{id}/active            - Activate or deactivate
//! POST /users/{id}/delete            - Delete user
//! POST /users/{id}/welcome           - Re-send welcome email
//!
//! # Inbox
//! GET  /notifications                - Notifications
//! POST /notifications/{id}/read      - Mark one read
//! POST /notifications/read-all       - Mark all read
//!
//! # Reports (append ?format=csv to download)
//! GET  /reports                      - Redirects to sales
//! GET  /reports/sales                - Sales by day, week or month
//! GET  /reports/products             - Sales per product
//! GET  /reports/customers            - Spend per customer
//!
//! # Settings
//! GET/POST /settings                 - Store settings
//! ```

pub mod attributes;
pub mod auth;
pub mod categories;
pub mod coupons;
pub mod dashboard;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod reports;
pub mod reviews;
pub mod settings;
pub mod users;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", post(orders::update_status))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index).post(products::create))
        .route("/products/new", get(products::new))
        .route("/products/{id}", post(products::update))
        .route("/products/{id}/edit", get(products::edit))
        .route("/products/{id}/delete", post(products::delete))
        .route(
            "/categories",
            get(categories::index).post(categories::create),
        )
        .route("/categories/new", get(categories::new))
        .route("/categories/{id}", post(categories::update))
        .route("/categories/{id}/edit", get(categories::edit))
        .route("/categories/{id}/delete", post(categories::delete))
        .route(
            "/attributes",
            get(attributes::index).post(attributes::create),
        )
        .route("/attributes/{id}", post(attributes::update))
        .route("/attributes/{id}/delete", post(attributes::delete))
}

/// Create the coupon and review routes router.
pub fn marketing_routes() -> Router<AppState> {
    Router::new()
        .route("/coupons", get(coupons::index).post(coupons::create))
        .route("/coupons/new", get(coupons::new))
        .route("/coupons/{id}", post(coupons::update))
        .route("/coupons/{id}/edit", get(coupons::edit))
        .route("/coupons/{id}/delete", post(coupons::delete))
        .route("/reviews", get(reviews::index))
        .route("/reviews/{id}/visibility", post(reviews::set_visibility))
        .route("/reviews/{id}/delete", post(reviews::delete))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index))
        .route("/{id}", get(users::show))
        .route("/{id}/role", post(users::update_role))
        .route("/{id}/active", post(users::set_active))
        .route("/{id}/delete", post(users::delete))
        .route("/{id}/welcome", post(users::send_welcome))
}

/// Create the report routes router.
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/reports/sales") }))
        .route("/sales", get(reports::sales))
        .route("/products", get(reports::products))
        .route("/customers", get(reports::customers))
}

/// Create all admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/settings", get(settings::show).post(settings::update))
        .route("/notifications", get(notifications::index))
        .route(
            "/notifications/read-all",
            post(notifications::mark_all_read),
        )
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .merge(catalog_routes())
        .merge(marketing_routes())
        .nest("/orders", order_routes())
        .nest("/users", user_routes())
        .nest("/reports", report_routes())
        .nest("/auth", auth_routes())
}
