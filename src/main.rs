//! Tiergate decision service.
//!
//! Serves the decision API over HTTP, backed by Redis. Counter resets are
//! served on a separate internal listener.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::{net::TcpListener, signal, sync::watch};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::{fmt, EnvFilter};

use tiergate::adapters::counter_store::{RedisCounterStore, TimeoutCounterStore};
use tiergate::adapters::http::{admin_router, decision_router, DecisionAppState};
use tiergate::adapters::{AtomicRateLimitMetrics, SystemClock};
use tiergate::application::RateLimitService;
use tiergate::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_logging(&config);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        tiers = ?config.rate_limit.tiers,
        endpoints = config.rate_limit.endpoints.len(),
        "Configuration loaded"
    );

    let redis = RedisCounterStore::connect(&config.redis).await?;
    let store = Arc::new(TimeoutCounterStore::new(Arc::new(redis), config.redis.timeout()));
    let metrics = Arc::new(AtomicRateLimitMetrics::new());
    let service = RateLimitService::new(
        config.rate_limit.clone(),
        store,
        Arc::new(SystemClock),
        metrics.clone(),
    );

    let state = DecisionAppState {
        service: Arc::new(service),
        metrics,
    };
    let app = decision_router(state.clone())
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());
    let admin = admin_router(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    let admin_addr = config.server.admin_socket_addr()?;
    let admin_listener = TcpListener::bind(admin_addr).await?;
    tracing::info!(addr = %admin_addr, "Admin listener ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(());
    });

    let public = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()))
        .into_future();
    let internal = axum::serve(admin_listener, admin.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
        .into_future();
    tokio::try_join!(public, internal)?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Human-readable logs in development, JSON in production.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(false)
            .try_init()
            .ok();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .try_init()
            .ok();
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<()>) {
    let _ = rx.changed().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
