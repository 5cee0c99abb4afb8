//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use booking::SystemClock;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    api::describe_metrics();

    let engine_config = config.engine_config();
    tracing::info!(?engine_config, "starting booking engine");
    let state = api::create_default_state(engine_config, Arc::new(SystemClock));

    // Expired holds are also reclaimed lazily, but the sweeper frees seats
    // nobody is looking at.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = state.engine.spawn_sweeper(shutdown_rx);

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "hold sweeper task failed");
    }

    tracing::info!("server shut down gracefully");
}
