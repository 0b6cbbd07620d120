//! Sapa Shop admin - back-office console.
//!
//! Serves the operator console on port 3001, over HTTPS when
//! `ADMIN_TLS_CERT`/`ADMIN_TLS_KEY` are set.
//!
//! Orders, catalog, marketing, users and reports all live behind the
//! commerce REST API. `PostgreSQL` holds console sessions only, and SMTP
//! (optional) carries order-status and welcome emails.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use sapa_admin::config::{AdminConfig, TlsConfig};
use sapa_admin::services::EmailService;
use sapa_admin::state::AppState;
use sapa_admin::{app, db, middleware};
use sapa_api::ApiClient;
use secrecy::ExposeSecret;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// In-flight requests get this long to finish on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

fn init_sentry(config: &AdminConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref()?;

    let options = sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: config
            .sentry_environment
            .clone()
            .map(std::borrow::Cow::Owned),
        sample_rate: config.sentry_sample_rate,
        traces_sample_rate: config.sentry_traces_sample_rate,
        attach_stacktrace: true,
        // Operator emails in events help triage console bugs.
        send_default_pii: true,
        ..Default::default()
    };
    Some(sentry::init((dsn, options)))
}

fn init_tracing(config: &AdminConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sapa_admin=info,sapa_api=info,tower_http=info".into());

    let fmt_layer = if config.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let sentry_layer = sentry_tracing::layer().event_filter(|metadata| match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(sentry_layer)
        .init();
}

/// Log whether the commerce API answers. Startup continues either way.
async fn check_api_reachable(api: &ApiClient) {
    match api.get_settings().await {
        Ok(settings) => {
            tracing::info!(api = %api.base_url(), store = %settings.store_name, "API reachable");
        }
        Err(e) => tracing::warn!(api = %api.base_url(), error = %e, "API not reachable yet"),
    }
}

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = AdminConfig::from_env().expect("Failed to load configuration");
    let _sentry_guard = init_sentry(&config);
    init_tracing(&config);

    // Session table comes from `sapa migrate admin`.
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    let api = ApiClient::new(&config.api).expect("Failed to create API client");
    check_api_reachable(&api).await;

    let email = EmailService::new(config.email.as_ref(), config.locale)
        .expect("Failed to configure SMTP transport");
    let sessions = middleware::create_session_layer(&pool, &config)
        .expect("Failed to configure session store");
    let state = AppState::new(config.clone(), pool, api, email);

    let router = app(state)
        .layer(sessions)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    match &config.tls {
        Some(tls) => serve_tls(router, addr, tls).await,
        None => serve_plain(router, addr).await,
    }
    tracing::info!("admin stopped");
}

async fn serve_tls(router: Router, addr: SocketAddr, tls: &TlsConfig) {
    let rustls = RustlsConfig::from_pem(
        tls.cert_pem.as_bytes().to_vec(),
        tls.key_pem.expose_secret().as_bytes().to_vec(),
    )
    .await
    .expect("Failed to load TLS certificates");

    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown_signal().await;
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    tracing::info!(%addr, "admin listening on https");
    axum_server::bind_rustls(addr, rustls)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("Server error");
}

async fn serve_plain(router: Router, addr: SocketAddr) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!(%addr, "admin listening on http");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
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
