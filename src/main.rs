//! Price-check relay for the UPC browser extension.
//!
//! Searches Mexican retailers through Oxylabs, optionally summarizes the
//! results with Gemini, and returns normalized offers over HTTP.
//!
//! # Environment Variables
//! - `OXYLABS_USERNAME` / `OXYLABS_PASSWORD` - Oxylabs credentials
//! - `GEMINI_KEY` / `GEMINI_API_KEY` - Gemini credential (optional)
//! - `PORT` - HTTP API port (default: 5000)
//! - `METRICS_PORT` - Prometheus metrics port (default: 9090)
//! - `MOCK_VENDORS` - Use canned search results (default: false)
//! - `RUST_LOG` - Log level (default: info)

use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use upc_price_relay::api::{self, AppState};
use upc_price_relay::config::{Config, VERSION};
use upc_price_relay::{metrics, server};

/// Run healthcheck mode: GET /health on the local API and exit 0 or 1.
async fn run_healthcheck() -> anyhow::Result<()> {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(5000);

    match server::check_health(port, Duration::from_secs(5)).await? {
        Some(url) => {
            eprintln!("healthcheck: service is healthy (via {url})");
            std::process::exit(0);
        }
        None => {
            eprintln!("healthcheck: failed to reach service via IPv4 or IPv6");
            std::process::exit(1);
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Check if running in healthcheck mode
    let program_name = std::env::args()
        .next()
        .and_then(|path| {
            std::path::Path::new(&path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
        })
        .unwrap_or_default();

    if program_name == "healthcheck" {
        return run_healthcheck().await;
    }

    info!(version = VERSION, "Starting UPC price relay");

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    for warning in config.validate() {
        warn!("{warning}");
    }

    info!(
        port = config.port,
        metrics_port = config.metrics_port,
        gemini = if config.gemini_configured() { "configured" } else { "NOT SET" },
        oxylabs = if config.oxylabs_configured() { "configured" } else { "NOT SET" },
        mock_vendors = config.mock_vendors,
        "Configuration loaded"
    );

    match metrics::init_metrics() {
        Ok(handle) => {
            let metrics_port = config.metrics_port;
            tokio::spawn(async move {
                metrics::start_metrics_server(metrics_port, handle).await;
            });
        }
        Err(e) => warn!(error = %e, "Prometheus recorder unavailable, metrics disabled"),
    }

    let listener = server::bind_listener(&config).await?;
    info!(addr = %listener.local_addr()?, "Starting HTTP server");

    let app = api::router(AppState::new(config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
