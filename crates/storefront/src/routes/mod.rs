//! HTTP route handlers for the storefront.
//!
//! Paths below are locale-less; every page is served as `/{locale}/...`.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                - Home page
//! POST /locale                          - Switch language
//!
//! # Catalog
//! GET  /products                        - Product listing (search, filters, sort)
//! GET  /products/{slug}                 - Product detail
//! POST /products/{slug}/reviews         - Write a review
//! GET  /categories                      - Category listing
//! GET  /categories/{slug}               - Category page
//!
//! # Cart
//! GET  /cart                            - Cart page
//! POST /cart/add                        - Add to cart (HTMX: 204 + cart-updated)
//! POST /cart/items/{id}                 - Change quantity (0 removes)
//! POST /cart/items/{id}/remove          - Remove a line
//! POST /cart/clear                      - Empty the cart
//! POST /cart/coupon                     - Apply a coupon
//! POST /cart/coupon/remove              - Remove the coupon
//! GET  /cart/count                      - Cart count badge (fragment)
//!
//! # Checkout and orders (requires auth)
//! GET  /checkout                        - Checkout page
//! POST /checkout                        - Place order
//! GET  /checkout/success/{order_id}     - Order placed
//! GET  /orders                          - Order history
//! GET  /orders/{id}                     - Order detail
//! POST /orders/{id}/cancel              - Request cancellation
//! POST /orders/{id}/refund              - Request refund
//!
//! # Account (requires auth)
//! GET  /account                         - Profile and password
//! POST /account/profile                 - Update profile
//! POST /account/password                - Change password
//! GET  /account/addresses               - Address book
//! GET  /account/addresses/new           - New address form
//! POST /account/addresses               - Create address
//! GET  /account/addresses/{id}/edit     - Edit address form
//! POST /account/addresses/{id}          - Update address
//! POST /account/addresses/{id}/delete   - Delete address
//! GET  /wishlist                        - Saved products
//! POST /wishlist/{product_id}           - Save a product
//! POST /wishlist/{product_id}/remove    - Remove a saved product
//! GET  /notifications                   - Notifications
//! POST /notifications/{id}/read         - Mark one read
//! POST /notifications/read-all          - Mark all read
//!
//! # Auth
//! GET/POST /auth/login                  - Login
//! GET/POST /auth/register               - Register
//! GET/POST /auth/forgot-password        - Request a reset link
//! GET/POST /auth/reset-password         - Set a new password
//! POST     /auth/logout                 - Logout
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod home;
pub mod locale;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod wishlist;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{action_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router. Form posts are rate limited per client IP.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(auth_rate_limiter())),
        )
        .route(
            "/register",
            get(auth::register_page).merge(post(auth::register).layer(auth_rate_limiter())),
        )
        .route(
            "/forgot-password",
            get(auth::forgot_password_page)
                .merge(post(auth::forgot_password).layer(auth_rate_limiter())),
        )
        .route(
            "/reset-password",
            get(auth::reset_password_page)
                .merge(post(auth::reset_password).layer(auth_rate_limiter())),
        )
        .route("/logout", post(auth::logout))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
        .route(
            "/products/{slug}/reviews",
            post(products::create_review).layer(action_rate_limiter()),
        )
        .route("/categories", get(categories::index))
        .route("/categories/{slug}", get(categories::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add).layer(action_rate_limiter()))
        .route("/items/{id}", post(cart::update).layer(action_rate_limiter()))
        .route(
            "/items/{id}/remove",
            post(cart::remove).layer(action_rate_limiter()),
        )
        .route("/clear", post(cart::clear))
        .route(
            "/coupon",
            post(cart::apply_coupon).layer(action_rate_limiter()),
        )
        .route("/coupon/remove", post(cart::remove_coupon))
        .route("/count", get(cart::count))
}

/// Create the checkout and order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", get(checkout::show).post(checkout::place))
        .route("/checkout/success/{order_id}", get(checkout::success))
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/cancel", post(orders::cancel))
        .route("/orders/{id}/refund", post(orders::refund))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/profile", post(account::update_profile))
        .route("/password", post(account::change_password))
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route("/addresses/new", get(account::new_address))
        .route("/addresses/{id}", post(account::update_address))
        .route("/addresses/{id}/edit", get(account::edit_address))
        .route("/addresses/{id}/delete", post(account::delete_address))
}

/// Create the wishlist and notification routes router.
pub fn inbox_routes() -> Router<AppState> {
    Router::new()
        .route("/wishlist", get(wishlist::index))
        .route(
            "/wishlist/{product_id}",
            post(wishlist::add).layer(action_rate_limiter()),
        )
        .route(
            "/wishlist/{product_id}/remove",
            post(wishlist::remove).layer(action_rate_limiter()),
        )
        .route("/notifications", get(notifications::index))
        .route("/notifications/read-all", post(notifications::read_all))
        .route("/notifications/{id}/read", post(notifications::read))
}

/// Create all localized routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/locale", post(locale::switch))
        .merge(catalog_routes())
        .merge(order_routes())
        .merge(inbox_routes())
        .nest("/cart", cart_routes())
        .nest("/account", account_routes())
        .nest("/auth", auth_routes())
}
