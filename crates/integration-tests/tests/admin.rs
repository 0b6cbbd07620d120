//! Admin console against the fake API: sign-in, order status changes and
//! sessions the API revokes.
//!
//! Run with: cargo test -p sapa-integration-tests --test admin

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use sapa_admin::middleware::session_layer;
use sapa_admin::services::email::EmailService;
use sapa_admin::state::AppState;
use sapa_core::{Locale, OrderStatus};
use sapa_integration_tests::{FakeApi, admin_config, lazy_pool};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

fn console(api: &FakeApi) -> Router {
    let state = AppState::new(
        admin_config(api.config()),
        lazy_pool(),
        api.client(),
        EmailService::disabled(Locale::En),
    );
    sapa_admin::app(state).layer(session_layer(MemoryStore::default(), false))
}

fn login_request(email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "email={}&password={password}&next=%2Forders",
            email.replace('@', "%40")
        )))
        .unwrap()
}

fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("sapa_admin_session="))
        .and_then(|v| v.split(';').next())
        .map(ToString::to_string)
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_admin_login_starts_session() {
    let api = FakeApi::start().await;
    api.state.add_account("ha@sapa.vn", "quan-tri", "ADMIN");
    let app = console(&api);

    let response = app
        .clone()
        .oneshot(login_request("ha@sapa.vn", "quan-tri"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/orders");
    let cookie = session_cookie(&response).unwrap();

    // Signed-in operators are bounced off the login page.
    let response = app
        .oneshot(
            Request::get("/auth/login")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
}

#[tokio::test]
async fn test_customer_login_is_refused_and_revoked() {
    let api = FakeApi::start().await;
    api.state
        .add_account("lan@sapa.vn", "mat-khau-1", "CUSTOMER");

    let response = console(&api)
        .oneshot(login_request("lan@sapa.vn", "mat-khau-1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
    let html = body_text(response).await;
    assert!(html.contains("no admin access"));

    let logouts = api.state.requests_to(&Method::POST, "/auth/logout");
    assert_eq!(logouts.len(), 1);
    assert_eq!(logouts[0].authorization.as_deref(), Some("Bearer access-1"));
}

#[tokio::test]
async fn test_wrong_password_shows_same_message() {
    let api = FakeApi::start().await;
    api.state.add_account("ha@sapa.vn", "quan-tri", "ADMIN");

    let response = console(&api)
        .oneshot(login_request("ha@sapa.vn", "sai"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("no admin access"));
    assert!(
        api.state
            .requests_to(&Method::POST, "/auth/logout")
            .is_empty()
    );
}

#[tokio::test]
async fn test_console_pages_require_login() {
    let api = FakeApi::start().await;

    let response = console(&api)
        .oneshot(
            Request::get("/orders?status=PENDING")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/auth/login?next=%2Forders%3Fstatus%3DPENDING"
    );
    assert!(api.state.requests().is_empty());
}

/// Sign in an operator and return the session cookie.
async fn signed_in(app: &Router, api: &FakeApi) -> String {
    api.state.add_account("ha@sapa.vn", "quan-tri", "ADMIN");
    let response = app
        .clone()
        .oneshot(login_request("ha@sapa.vn", "quan-tri"))
        .await
        .unwrap();
    session_cookie(&response).unwrap()
}

async fn get(app: &Router, uri: &str, cookie: &str) -> Response {
    app.clone()
        .oneshot(
            Request::get(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn post_status(app: &Router, id: &str, form: &str, cookie: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/orders/{id}/status"))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(header::COOKIE, cookie)
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_status_change_is_sent_to_api() {
    let api = FakeApi::start().await;
    api.state.add_order("o1", OrderStatus::Pending);
    let app = console(&api);
    let cookie = signed_in(&app, &api).await;

    let response = post_status(&app, "o1", "status=PROCESSING&note=Packed", &cookie).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/orders/o1"
    );

    assert_eq!(
        api.state
            .requests_to(&Method::PATCH, "/orders/o1/status")
            .len(),
        1
    );
    let order = api.state.order("o1").unwrap();
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.history.last().unwrap().1.as_deref(), Some("Packed"));
}

#[tokio::test]
async fn test_illegal_status_change_never_reaches_api() {
    let api = FakeApi::start().await;
    api.state.add_order("o1", OrderStatus::Pending);
    let app = console(&api);
    let cookie = signed_in(&app, &api).await;

    let response = post_status(&app, "o1", "status=DELIVERED", &cookie).await;
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/orders/o1"
    );
    assert!(
        api.state
            .requests_to(&Method::PATCH, "/orders/o1/status")
            .is_empty()
    );
    assert_eq!(api.state.order("o1").unwrap().status, OrderStatus::Pending);

    let html = body_text(get(&app, "/orders/o1", &cookie).await).await;
    assert!(html.contains("Cannot move an order from"));
}

#[tokio::test]
async fn test_revoked_session_goes_to_login_once() {
    let api = FakeApi::start().await;
    let app = console(&api);
    let cookie = signed_in(&app, &api).await;
    assert_eq!(get(&app, "/orders", &cookie).await.status(), StatusCode::OK);

    api.state.revoke_all();

    let response = get(&app, "/orders", &cookie).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/auth/login?next=%2Forders&expired=1"
    );

    // The stale cookie no longer signs anyone in, so the form renders.
    let response = get(&app, "/auth/login?next=%2Forders&expired=1", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
}
