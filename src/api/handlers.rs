//! HTTP handlers for the extension-facing API.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use tracing::{info, instrument};

use super::state::AppState;
use crate::config::{ConfigInfo, VERSION};
use crate::error::ServiceError;
use crate::metrics;
use crate::query::{CheckPriceRequest, PriceQuery, SearchType};
use crate::summarize::{Offer, PriceRange};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct DebugResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: ConfigInfo,
    pub services: ServicesInfo,
    pub platform: String,
}

#[derive(Debug, Serialize)]
pub struct ServicesInfo {
    pub gemini: GeminiInfo,
    pub oxylabs: OxylabsInfo,
}

#[derive(Debug, Serialize)]
pub struct GeminiInfo {
    pub available: bool,
    pub loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct OxylabsInfo {
    pub configured: bool,
    pub loaded: bool,
}

/// Successful `POST /check_price` body.
#[derive(Debug, Serialize)]
pub struct CheckPriceResponse {
    pub offers: Vec<Offer>,
    pub summary: String,
    pub total_offers: usize,
    pub powered_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
}

/// Liveness probe; answers without touching vendor clients.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: VERSION,
        timestamp: chrono::Utc::now().timestamp(),
    })
}

/// Configuration and client status, without secrets.
pub async fn debug(State(state): State<AppState>) -> Json<DebugResponse> {
    let config = &state.config;
    Json(DebugResponse {
        status: "ok",
        version: VERSION,
        environment: config.info(),
        services: ServicesInfo {
            gemini: GeminiInfo {
                available: config.gemini_configured(),
                loaded: state.services.summarizer_loaded(),
            },
            oxylabs: OxylabsInfo {
                configured: config.oxylabs_configured(),
                loaded: state.services.search_loaded(),
            },
        },
        platform: config.platform.clone(),
    })
}

/// CORS preflight without an `Origin` header.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[instrument(skip_all)]
pub async fn check_price(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CheckPriceResponse>, ServiceError> {
    let start = Instant::now();
    metrics::increment_check_count();

    let result = run_check(&state, &body).await;
    metrics::record_check_latency(start.elapsed().as_secs_f64() * 1000.0);

    match &result {
        Ok(response) => metrics::record_offers_returned(response.total_offers),
        Err(_) => metrics::increment_check_errors(),
    }
    result.map(Json)
}

async fn run_check(state: &AppState, body: &[u8]) -> Result<CheckPriceResponse, ServiceError> {
    let request = parse_body(body)?;
    let query = PriceQuery::try_from(request)?;
    info!(
        query = %query.text,
        upc = %query.upc,
        search_query = %query.search_query,
        search_type = ?query.search_type,
        "Processing price check"
    );

    let provider = state.services.search().await?;
    let results = match query.search_type {
        SearchType::Shopping => provider.search_shopping(&query.search_query).await?,
    };

    if results.is_empty() {
        return Ok(CheckPriceResponse {
            offers: Vec::new(),
            summary: "No results found".to_string(),
            total_offers: 0,
            powered_by: provider.name().to_string(),
            price_range: None,
        });
    }

    let summarizer = state.services.summarizer().await?;
    let analysis = summarizer.analyze(&results, &query.search_query).await;

    let powered_by = if analysis.ai_generated {
        format!("{} + {}", provider.name(), summarizer.name())
    } else {
        provider.name().to_string()
    };

    info!(offers = analysis.offers.len(), powered_by = %powered_by, "Returning offers");

    Ok(CheckPriceResponse {
        price_range: PriceRange::from_offers(&analysis.offers),
        total_offers: analysis.offers.len(),
        offers: analysis.offers,
        summary: analysis.summary,
        powered_by,
    })
}

/// The body must be a JSON object; anything else counts as no data.
fn parse_body(body: &[u8]) -> Result<CheckPriceRequest, ServiceError> {
    let no_data = || ServiceError::InvalidRequest("No data provided".to_string());

    let value: serde_json::Value = serde_json::from_slice(body).map_err(|_| no_data())?;
    if !value.as_object().is_some_and(|map| !map.is_empty()) {
        return Err(no_data());
    }
    serde_json::from_value(value).map_err(|_| no_data())
}

/// Answer CORS preflights with 204, including the ones the CORS layer
/// short-circuits with 200.
pub async fn preflight_no_content(request: Request, next: Next) -> Response {
    let is_options = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;
    if is_options && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

/// Log every request except health probes.
pub async fn log_request(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if path != "/health" && path != "/api/health" {
        info!(method = %request.method(), path = %path, "Incoming request");
    }
    next.run(request).await
}
