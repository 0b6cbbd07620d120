//! Sapa Shop storefront library.
//!
//! The binary in `main.rs` only wires configuration, tracing and the
//! session store around [`app`]; everything else lives here so the
//! integration tests can drive the same router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod breadcrumbs;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod i18n;
pub mod middleware;
pub mod models;
pub mod page;
pub mod routes;
pub mod services;
pub mod state;
pub mod views;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, StatusCode, header::CACHE_CONTROL},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use tower::Layer;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use state::AppState;

/// Directory served under `/static`.
pub const STATIC_DIR: &str = "crates/storefront/static";

/// Stylesheets are fingerprinted by `build.rs`; everything else revalidates hourly.
const STATIC_CACHE_CONTROL: &str = "public, max-age=3600";

/// Build the storefront application without a session layer.
///
/// Localised pages are routed by an inner router that only ever sees
/// locale-less paths; [`middleware::locale_middleware`] strips the
/// `/{locale}` prefix (or redirects when it is missing) before the inner
/// router runs. Callers add the `SessionManagerLayer` on top.
pub fn app(state: AppState) -> Router {
    let localized = routes::routes()
        .layer(from_fn_with_state(
            state.clone(),
            middleware::token_writeback_middleware,
        ))
        .with_state(state.clone());

    let static_files = SetResponseHeaderLayer::if_not_present(
        CACHE_CONTROL,
        HeaderValue::from_static(STATIC_CACHE_CONTROL),
    )
    .layer(ServeDir::new(STATIC_DIR));

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest_service("/static", static_files)
        .fallback_service(localized)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::locale_middleware,
        ))
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::csp_nonce_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies session-store connectivity. Returns 503 when the database
/// is unreachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if db::is_ready(state.pool()).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
