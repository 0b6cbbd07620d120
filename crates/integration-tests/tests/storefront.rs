//! Storefront router against the fake API.
//!
//! Signed-in flows go through [`Shopper`], which carries the session cookie
//! from one response to the next request like a browser would.
//!
//! Run with: cargo test -p sapa-integration-tests --test storefront

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use sapa_core::OrderStatus;
use sapa_integration_tests::{FakeApi, SOLD_OUT, lazy_pool, storefront_config};
use sapa_storefront::middleware::session_layer;
use sapa_storefront::state::AppState;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

fn storefront(api: &FakeApi) -> Router {
    let state = AppState::new(storefront_config(api.config()), lazy_pool()).unwrap();
    sapa_storefront::app(state).layer(session_layer(MemoryStore::default(), false))
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_skips_locale_redirect() {
    let api = FakeApi::start().await;
    let response = storefront(&api)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_bare_path_redirects_to_default_locale() {
    let api = FakeApi::start().await;
    let response = storefront(&api)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/vi");
}

#[tokio::test]
async fn test_accept_language_picks_locale_and_keeps_query() {
    let api = FakeApi::start().await;
    let response = storefront(&api)
        .oneshot(
            Request::get("/products?sort=newest&page=2")
                .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9,vi;q=0.5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/en/products?sort=newest&page=2");
}

#[tokio::test]
async fn test_locale_cookie_beats_accept_language() {
    let api = FakeApi::start().await;
    let response = storefront(&api)
        .oneshot(
            Request::get("/cart")
                .header(header::COOKIE, "sapa_locale=vi")
                .header(header::ACCEPT_LANGUAGE, "en")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(location(&response), "/vi/cart");
}

#[tokio::test]
async fn test_forgot_password_shows_api_message() {
    let api = FakeApi::start().await;
    let response = storefront(&api)
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/vi/auth/forgot-password")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header("x-forwarded-for", "203.0.113.7")
                .body(Body::from("email=lan%40sapa.vn"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let pinned = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with("sapa_locale=vi"));
    assert!(pinned);
    let html = body_text(response).await;
    assert!(html.contains("Reset link sent to lan@sapa.vn"));

    let calls = api
        .state
        .requests_to(&Method::POST, "/auth/forgot-password");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].accept_language.as_deref(), Some("vi"));
}

#[tokio::test]
async fn test_forgot_password_rejects_bad_email_without_calling_api() {
    let api = FakeApi::start().await;
    let response = storefront(&api)
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/en/auth/forgot-password")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header("x-forwarded-for", "203.0.113.8")
                .body(Body::from("email=not-an-email"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        api.state
            .requests_to(&Method::POST, "/auth/forgot-password")
            .is_empty()
    );
}

const SESSION_COOKIE: &str = "sapa_session";

/// One browser: a router plus whatever session cookie it was last handed.
struct Shopper {
    app: Router,
    cookie: Option<String>,
}

impl Shopper {
    /// Sign in as a fresh customer through the login form.
    async fn signed_in(api: &FakeApi, locale: &str) -> Self {
        api.state
            .add_account("lan@sapa.vn", "mat-khau-1", "CUSTOMER");
        let mut shopper = Self {
            app: storefront(api),
            cookie: None,
        };
        let response = shopper
            .post(
                &format!("/{locale}/auth/login"),
                "email=lan%40sapa.vn&password=mat-khau-1",
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(shopper.cookie.is_some());
        shopper
    }

    async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> Response {
        let mut builder = builder.header("x-forwarded-for", "203.0.113.20");
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let set = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&format!("{SESSION_COOKIE}=")))
            .and_then(|v| v.split(';').next())
            .map(ToString::to_string);
        if let Some(pair) = set {
            let cleared = pair.len() == SESSION_COOKIE.len() + 1;
            self.cookie = (!cleared).then_some(pair);
        }
        response
    }

    async fn get(&mut self, uri: &str) -> Response {
        self.send(Request::get(uri), Body::empty()).await
    }

    async fn post(&mut self, uri: &str, form: &str) -> Response {
        let builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(builder, Body::from(form.to_string())).await
    }
}

#[tokio::test]
async fn test_cart_add_update_and_remove() {
    let api = FakeApi::start().await;
    let mut shopper = Shopper::signed_in(&api, "vi").await;

    let response = shopper
        .post("/vi/cart/add", "product_id=p1&quantity=2")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/vi/cart");
    let cart = api.state.cart();
    assert_eq!(cart.len(), 1);
    assert_eq!((cart[0].id.as_str(), cart[0].quantity), ("ci1", 2));

    let response = shopper.post("/vi/cart/items/ci1", "quantity=5").await;
    assert_eq!(location(&response), "/vi/cart");
    assert_eq!(api.state.cart()[0].quantity, 5);
    assert_eq!(
        api.state
            .requests_to(&Method::PATCH, "/cart/items/ci1")
            .len(),
        1
    );

    // Zero is a removal, not an update.
    let response = shopper.post("/vi/cart/items/ci1", "quantity=0").await;
    assert_eq!(location(&response), "/vi/cart");
    assert!(api.state.cart().is_empty());
    assert_eq!(
        api.state
            .requests_to(&Method::DELETE, "/cart/items/ci1")
            .len(),
        1
    );
    assert_eq!(
        api.state
            .requests_to(&Method::PATCH, "/cart/items/ci1")
            .len(),
        1
    );
}

#[tokio::test]
async fn test_sold_out_product_flashes_and_leaves_cart_alone() {
    let api = FakeApi::start().await;
    let mut shopper = Shopper::signed_in(&api, "en").await;

    let response = shopper
        .post("/en/cart/add", &format!("product_id={SOLD_OUT}"))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(api.state.cart().is_empty());

    let html = body_text(shopper.get("/en/cart").await).await;
    assert!(html.contains("Out of stock"));
}

#[tokio::test]
async fn test_checkout_places_order_from_cart() {
    let api = FakeApi::start().await;
    let mut shopper = Shopper::signed_in(&api, "vi").await;
    shopper
        .post("/vi/cart/add", "product_id=p1&quantity=3")
        .await;

    let response = shopper
        .post("/vi/checkout", "address_id=a1&payment_method=COD")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/vi/checkout/success/o1");

    let order = api.state.order("o1").unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.quantity, 3);
    assert!(api.state.cart().is_empty());

    assert_eq!(order.address_id.as_deref(), Some("a1"));
    assert_eq!(order.payment_method, "COD");
}

#[tokio::test]
async fn test_checkout_with_empty_cart_returns_to_checkout() {
    let api = FakeApi::start().await;
    let mut shopper = Shopper::signed_in(&api, "vi").await;

    let response = shopper
        .post("/vi/checkout", "address_id=a1&payment_method=COD")
        .await;
    assert_eq!(location(&response), "/vi/checkout");
    assert!(api.state.orders().is_empty());
}

#[tokio::test]
async fn test_cancel_and_refund_requests() {
    let api = FakeApi::start().await;
    api.state.add_order("o1", OrderStatus::Pending);
    api.state.add_order("o2", OrderStatus::Delivered);
    let mut shopper = Shopper::signed_in(&api, "en").await;

    let response = shopper
        .post("/en/orders/o1/cancel", "reason=Ordered+the+wrong+size")
        .await;
    assert_eq!(location(&response), "/en/orders/o1");
    assert_eq!(
        api.state.order("o1").unwrap().status,
        OrderStatus::CancellationRequested
    );

    // A delivered order cannot be cancelled; the API is never asked.
    let response = shopper
        .post("/en/orders/o2/cancel", "reason=Changed+my+mind")
        .await;
    assert_eq!(location(&response), "/en/orders/o2");
    assert!(
        api.state
            .requests_to(&Method::POST, "/orders/o2/cancel-request")
            .is_empty()
    );
    let html = body_text(shopper.get("/en/orders/o2").await).await;
    assert!(html.contains("This order can no longer be cancelled."));

    let response = shopper
        .post("/en/orders/o2/refund", "reason=Arrived+damaged")
        .await;
    assert_eq!(location(&response), "/en/orders/o2");
    let order = api.state.order("o2").unwrap();
    assert_eq!(order.status, OrderStatus::RefundRequested);
    assert_eq!(
        order.history.last().unwrap().1.as_deref(),
        Some("Arrived damaged")
    );
}

#[tokio::test]
async fn test_revoked_session_goes_to_login_once() {
    let api = FakeApi::start().await;
    let mut shopper = Shopper::signed_in(&api, "vi").await;
    assert_eq!(shopper.get("/vi/orders").await.status(), StatusCode::OK);

    api.state.revoke_all();

    let response = shopper.get("/vi/orders").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/vi/auth/login?next=%2Forders&expired=1"
    );
    assert_eq!(
        api.state.requests_to(&Method::POST, "/auth/refresh").len(),
        1
    );

    // The login page renders instead of bouncing back to the account.
    let response = shopper.get(location(&response).to_string().as_str()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = shopper.get("/vi/orders").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/vi/auth/login?next=%2Forders");
}
