//! Extension-facing HTTP API.
//!
//! Every route is mounted both at the root and under `/api` so the extension
//! works behind proxies that forward either prefix.

pub mod handlers;
mod state;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::{AppState, Services};

/// Build the API router with CORS for the browser extension.
pub fn router(state: AppState) -> Router {
    let check_price = post(handlers::check_price).options(handlers::preflight);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/health", get(handlers::health))
        .route("/debug", get(handlers::debug))
        .route("/api/debug", get(handlers::debug))
        .route("/check_price", check_price.clone())
        .route("/api/check_price", check_price)
        .layer(middleware::from_fn(handlers::log_request))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(handlers::preflight_no_content))
        .with_state(state)
}
