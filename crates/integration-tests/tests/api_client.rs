//! `ApiClient` against the in-process fake API.
//!
//! Run with: cargo test -p sapa-integration-tests --test api_client

#![allow(clippy::unwrap_used)]

use axum::http::Method;
use sapa_api::types::LoginRequest;
use sapa_api::{ApiError, AuthSession, TokenPair};
use sapa_core::{Locale, OrderId, OrderStatus, ProductId};
use sapa_integration_tests::{ACCESS_TTL_SECS, FakeApi};

fn session(api: &FakeApi) -> AuthSession {
    let (access, refresh) = api.state.issue_tokens();
    AuthSession::new(TokenPair::new(access, Some(refresh), ACCESS_TTL_SECS))
}

#[tokio::test]
async fn test_login_reads_refresh_token_from_cookie() {
    let api = FakeApi::start().await;
    api.state
        .add_account("lan@sapa.vn", "mat-khau-1", "CUSTOMER");

    let result = api
        .client()
        .login(&LoginRequest {
            email: "lan@sapa.vn".to_string(),
            password: "mat-khau-1".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(result.user.email, "lan@sapa.vn");
    assert!(!result.user.is_admin());
    assert_eq!(result.tokens.access_token, "access-1");
    assert_eq!(result.tokens.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let api = FakeApi::start().await;
    api.state
        .add_account("lan@sapa.vn", "mat-khau-1", "CUSTOMER");

    let err = api
        .client()
        .login(&LoginRequest {
            email: "lan@sapa.vn".to_string(),
            password: "sai".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}

#[tokio::test]
async fn test_authenticated_calls_send_bearer_and_locale() {
    let api = FakeApi::start().await;
    let auth = session(&api);

    api.client()
        .with_locale(Locale::En)
        .get_wishlist(&auth)
        .await
        .unwrap();

    let calls = api.state.requests_to(&Method::GET, "/wishlist");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].authorization.as_deref(), Some("Bearer access-1"));
    assert_eq!(calls[0].accept_language.as_deref(), Some("en"));
    assert!(!auth.refreshed());
}

#[tokio::test]
async fn test_public_calls_send_no_bearer() {
    let api = FakeApi::start().await;

    let settings = api.client().get_settings().await.unwrap();
    assert_eq!(settings.store_name, "Sapa Shop");

    let calls = api.state.requests_to(&Method::GET, "/settings");
    assert_eq!(calls.len(), 1);
    assert!(calls[0].authorization.is_none());
}

#[tokio::test]
async fn test_settings_are_cached() {
    let api = FakeApi::start().await;
    let client = api.client();

    client.get_settings().await.unwrap();
    client.get_settings().await.unwrap();
    assert_eq!(api.state.requests_to(&Method::GET, "/settings").len(), 1);

    client.invalidate_settings().await;
    client.get_settings().await.unwrap();
    assert_eq!(api.state.requests_to(&Method::GET, "/settings").len(), 2);
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_replayed_once() {
    let api = FakeApi::start().await;
    let auth = session(&api);
    api.state.expire("access-1");

    api.client().get_wishlist(&auth).await.unwrap();

    assert!(auth.refreshed());
    assert_eq!(auth.access_token(), "access-2");
    assert_eq!(auth.refresh_token().as_deref(), Some("refresh-2"));

    let refreshes = api.state.requests_to(&Method::POST, "/auth/refresh");
    assert_eq!(refreshes.len(), 1);
    assert_eq!(
        refreshes[0].cookie.as_deref(),
        Some("refresh_token=refresh-1")
    );
    assert!(refreshes[0].authorization.is_none());

    let calls = api.state.requests_to(&Method::GET, "/wishlist");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].authorization.as_deref(), Some("Bearer access-1"));
    assert_eq!(calls[1].authorization.as_deref(), Some("Bearer access-2"));
}

#[tokio::test]
async fn test_concurrent_requests_share_one_refresh() {
    let api = FakeApi::start().await;
    let (access, refresh) = api.state.issue_tokens();
    api.state.expire(&access);
    // Two requests from one browser session, both holding the expired pair.
    let pair = TokenPair::new(access, Some(refresh), ACCESS_TTL_SECS);
    let first = AuthSession::new(pair.clone());
    let second = AuthSession::new(pair);
    let client = api.client();

    let (a, b) = tokio::join!(client.get_wishlist(&first), client.get_wishlist(&second));

    a.unwrap();
    b.unwrap();
    assert_eq!(
        api.state.requests_to(&Method::POST, "/auth/refresh").len(),
        1
    );
    assert_eq!(first.tokens(), second.tokens());
    assert_eq!(first.access_token(), "access-2");
}

#[tokio::test]
async fn test_late_request_with_consumed_refresh_token_succeeds() {
    let api = FakeApi::start().await;
    let (access, refresh) = api.state.issue_tokens();
    api.state.expire(&access);
    let pair = TokenPair::new(access, Some(refresh), ACCESS_TTL_SECS);
    let client = api.client();

    let first = AuthSession::new(pair.clone());
    client.get_wishlist(&first).await.unwrap();
    // The fake API has already dropped refresh-1.
    let second = AuthSession::new(pair);
    client.get_wishlist(&second).await.unwrap();

    assert_eq!(
        api.state.requests_to(&Method::POST, "/auth/refresh").len(),
        1
    );
    assert_eq!(second.refresh_token().as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn test_rejected_refresh_surfaces_unauthorized() {
    let api = FakeApi::start().await;
    let auth = session(&api);
    api.state.expire("access-1");
    api.state.revoke_refresh("refresh-1");

    let err = api.client().get_wishlist(&auth).await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized));
    assert!(!auth.refreshed());
    assert_eq!(api.state.requests_to(&Method::GET, "/wishlist").len(), 1);
    assert_eq!(
        api.state.requests_to(&Method::POST, "/auth/refresh").len(),
        1
    );
}

#[tokio::test]
async fn test_no_refresh_token_means_no_refresh_attempt() {
    let api = FakeApi::start().await;
    let (access, _) = api.state.issue_tokens();
    let auth = AuthSession::new(TokenPair::new(access.clone(), None, ACCESS_TTL_SECS));
    api.state.expire(&access);

    let err = api.client().get_wishlist(&auth).await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized));
    assert!(
        api.state
            .requests_to(&Method::POST, "/auth/refresh")
            .is_empty()
    );
}

#[tokio::test]
async fn test_wishlist_removal_issues_exactly_one_delete() {
    let api = FakeApi::start().await;
    let auth = session(&api);

    api.client()
        .remove_from_wishlist(&ProductId::from("p-42"), &auth)
        .await
        .unwrap();

    let deletes: Vec<_> = api
        .state
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::DELETE)
        .collect();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].path, "/wishlist/p-42");
}

#[tokio::test]
async fn test_failed_wishlist_removal_is_not_retried() {
    let api = FakeApi::start().await;
    let auth = session(&api);

    let err = api
        .client()
        .remove_from_wishlist(&ProductId::from("missing"), &auth)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(
        api.state
            .requests_to(&Method::DELETE, "/wishlist/missing")
            .len(),
        1
    );
}

#[tokio::test]
async fn test_forgot_password_returns_api_message() {
    let api = FakeApi::start().await;

    let message = api.client().forgot_password("lan@sapa.vn").await.unwrap();

    assert_eq!(message.as_deref(), Some("Reset link sent to lan@sapa.vn"));
    let calls = api
        .state
        .requests_to(&Method::POST, "/auth/forgot-password");
    assert_eq!(calls.len(), 1);
    assert!(calls[0].authorization.is_none());
}

#[tokio::test]
async fn test_order_status_follows_admin_transitions() {
    let api = FakeApi::start().await;
    api.state.add_order("o1", OrderStatus::Pending);
    let auth = session(&api);
    let client = api.client();
    let id = OrderId::new("o1");

    let err = client
        .update_order_status(&id, OrderStatus::Shipped, None, &auth)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert_eq!(api.state.order("o1").unwrap().status, OrderStatus::Pending);

    let order = client
        .update_order_status(
            &id,
            OrderStatus::Processing,
            Some("Packed".to_string()),
            &auth,
        )
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(
        order.history.last().unwrap().note.as_deref(),
        Some("Packed")
    );
}
