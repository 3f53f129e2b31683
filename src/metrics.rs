//! Prometheus metrics for the price relay.
//!
//! Exposes an HTTP endpoint for Prometheus scraping.

use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::{error, info};

/// Initialize the metrics system and return the Prometheus handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    describe_histogram!(
        "price_check_latency_ms",
        "Time taken to answer a price check in milliseconds"
    );
    describe_histogram!(
        "price_check_offers",
        "Number of offers returned per successful price check"
    );
    describe_histogram!(
        "vendor_request_latency_ms",
        "Latency of outbound vendor calls in milliseconds"
    );
    describe_counter!("price_check_total", "Total number of price checks processed");
    describe_counter!("price_check_errors_total", "Total number of failed price checks");

    PrometheusBuilder::new().install_recorder()
}

pub fn record_check_latency(latency_ms: f64) {
    histogram!("price_check_latency_ms").record(latency_ms);
}

pub fn record_offers_returned(count: usize) {
    histogram!("price_check_offers").record(count as f64);
}

/// Record an outbound call to a vendor (`oxylabs`, `gemini`).
pub fn record_vendor_latency(vendor: &'static str, latency_ms: f64) {
    histogram!("vendor_request_latency_ms", "vendor" => vendor).record(latency_ms);
}

pub fn increment_check_count() {
    counter!("price_check_total").increment(1);
}

pub fn increment_check_errors() {
    counter!("price_check_errors_total").increment(1);
}

/// Create an Axum router for the metrics HTTP endpoint.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
}

/// Start the metrics HTTP server on the given port with auto-detect binding.
pub async fn start_metrics_server(port: u16, handle: PrometheusHandle) {
    let app = metrics_router(handle);

    // Try dual-stack first, fall back to IPv4-only
    let listener = match tokio::net::TcpListener::bind(("::", port)).await {
        Ok(listener) => {
            info!(port = port, bind = "::", "Starting metrics server (dual-stack)");
            listener
        }
        Err(_) => match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => {
                info!(port = port, bind = "0.0.0.0", "Starting metrics server (IPv4-only fallback)");
                listener
            }
            Err(e) => {
                error!(port = port, error = %e, "Failed to bind metrics server");
                return;
            }
        },
    };

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Metrics server failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn test_recorders_without_exporter() {
        // metrics falls back to a no-op recorder when none is installed
        record_check_latency(12.5);
        record_offers_returned(3);
        record_vendor_latency("oxylabs", 800.0);
        increment_check_count();
        increment_check_errors();
    }

    #[tokio::test]
    async fn test_metrics_router_returns_metrics() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let app = metrics_router(handle);

        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("content-type").is_some());
    }

    #[tokio::test]
    async fn test_start_metrics_server_binds_and_serves() {
        use http_body_util::{BodyExt, Empty};
        use hyper::body::Bytes;
        use std::net::TcpListener as StdTcpListener;

        // Find an available port
        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let server_handle = tokio::spawn(async move {
            start_metrics_server(port, handle).await;
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let client: hyper_util::client::legacy::Client<_, Empty<Bytes>> =
            hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                .build_http();

        let uri: hyper::Uri = format!("http://127.0.0.1:{}/metrics", port).parse().unwrap();
        let response = client.get(uri).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body_str = String::from_utf8_lossy(&body_bytes);
        assert!(body_str.is_empty() || !body_str.contains("<html>"));

        server_handle.abort();
    }
}
