//! Sapa Shop storefront - public e-commerce site.
//!
//! Serves the shop on port 3000 in Vietnamese and English. Catalog, cart,
//! orders and accounts come from the commerce REST API; `PostgreSQL` only
//! backs the session store (`sapa migrate storefront` creates it).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::borrow::Cow;
use std::net::SocketAddr;
use std::time::Duration;

use sapa_storefront::config::StorefrontConfig;
use sapa_storefront::state::AppState;
use sapa_storefront::{app, db, middleware, services};
use sentry::integrations::tracing::{self as sentry_tracing, EventFilter};
use tracing::Level;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Refresh entries for sessions idle this long are dropped.
const TOKEN_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

const DEFAULT_LOG_FILTER: &str = "sapa_storefront=info,sapa_api=info,tower_http=debug";

fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref()?;
    let options = sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: config.sentry_environment.clone().map(Cow::Owned),
        sample_rate: config.sentry_sample_rate,
        traces_sample_rate: config.sentry_traces_sample_rate,
        attach_stacktrace: true,
        ..Default::default()
    };
    Some(sentry::init((dsn, options)))
}

/// Warnings become Sentry events; info and debug ride along as breadcrumbs.
fn sentry_filter(metadata: &tracing::Metadata<'_>) -> EventFilter {
    let level = *metadata.level();
    if level <= Level::WARN {
        EventFilter::Event
    } else if level <= Level::DEBUG {
        EventFilter::Breadcrumb
    } else {
        EventFilter::Ignore
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let fmt = tracing_subscriber::fmt::layer();
    let fmt = if json { fmt.json().boxed() } else { fmt.boxed() };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt)
        .with(sentry_tracing::layer().event_filter(sentry_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");
    // Sentry before tracing, so the tracing layer finds a live hub.
    let _sentry = init_sentry(&config);
    init_tracing(config.log_json);

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    let state = AppState::new(config, pool).expect("Failed to initialize application state");
    tracing::info!(
        api = %state.config().api.base_url,
        default_locale = %state.config().default_locale,
        "storefront state ready"
    );

    services::token_keeper::spawn_sweeper(state.tokens(), TOKEN_SWEEP_INTERVAL);

    let addr = state.config().socket_addr();
    let sessions = middleware::create_session_layer(state.pool(), state.config());
    let router = app(state)
        .layer(sessions)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "storefront listening");

    // Rate limiters fall back to the peer address without a proxy header.
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    tracing::info!("storefront stopped");
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.expect("Failed to install Ctrl+C handler"),
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");

    tracing::info!("Shutdown signal received, draining connections");
}
