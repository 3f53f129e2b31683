//! Oxylabs realtime API client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use super::extract::extract_results;
use super::filter::filter_mexican_stores;
use super::provider::{RawResult, SearchProvider};
use crate::config::Config;
use crate::error::ServiceError;
use crate::metrics;
use crate::query::provider_query;

/// Number of organic results requested; more than we return so the filter has room.
const RESULT_LIMIT: u32 = 20;

#[derive(Debug, Serialize)]
struct QueryPayload<'a> {
    source: &'a str,
    domain: &'a str,
    query: &'a str,
    parse: bool,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    /// Oxylabs sends `null` as well as omitting the key when nothing came back
    #[serde(default)]
    results: Option<Vec<QueryResult>>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    content: Value,
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    parser_type: Option<String>,
}

/// Google Search through Oxylabs, restricted to `.mx` sites.
pub struct OxylabsProvider {
    http: Client,
    api_url: String,
    credentials: Option<(String, String)>,
    timeout: Duration,
}

impl OxylabsProvider {
    /// Create a provider from configuration. Missing credentials are not an
    /// error here; searches fail with `ProviderNotConfigured` instead.
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        let timeout = Duration::from_secs(config.oxylabs_timeout_secs);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Internal(format!("Failed to build Oxylabs client: {e}")))?;

        let credentials = match (&config.oxylabs_username, &config.oxylabs_password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        };

        info!(api_url = %config.oxylabs_api_url, configured = credentials.is_some(), "Initialized Oxylabs provider");

        Ok(Self {
            http,
            api_url: config.oxylabs_api_url.clone(),
            credentials,
            timeout,
        })
    }

    async fn fetch(&self, search_query: &str) -> Result<QueryResponse, ServiceError> {
        let (username, password) = self
            .credentials
            .as_ref()
            .ok_or(ServiceError::ProviderNotConfigured)?;

        let payload = QueryPayload {
            source: "google_search",
            domain: "com.mx",
            query: search_query,
            parse: true,
            limit: RESULT_LIMIT,
        };

        let response = self
            .http
            .post(&self.api_url)
            .basic_auth(username, Some(password))
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status() != StatusCode::OK {
            error!(status = response.status().as_u16(), "Oxylabs HTTP error");
            return Err(ServiceError::ProviderHttp(response.status().as_u16()));
        }

        response.json().await.map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, err: reqwest::Error) -> ServiceError {
        let err = ServiceError::from(err);
        match &err {
            ServiceError::ProviderTimeout => {
                error!(timeout_secs = self.timeout.as_secs(), "Oxylabs request timed out")
            }
            other => error!(error = %other, "Oxylabs request failed"),
        }
        err
    }
}

#[async_trait]
impl SearchProvider for OxylabsProvider {
    #[instrument(skip(self), fields(provider = "oxylabs"))]
    async fn search_shopping(&self, query: &str) -> Result<Vec<RawResult>, ServiceError> {
        if !self.is_configured() {
            error!("Oxylabs credentials not configured");
            return Err(ServiceError::ProviderNotConfigured);
        }

        let search_query = provider_query(query);
        info!(original = %query, search_query = %search_query, "Querying Oxylabs");

        let start = Instant::now();
        let outcome = self.fetch(&search_query).await;
        metrics::record_vendor_latency("oxylabs", start.elapsed().as_secs_f64() * 1000.0);
        let data = outcome?;

        let Some(first) = data.results.as_deref().and_then(|r| r.first()) else {
            warn!("Oxylabs returned no results");
            return Ok(Vec::new());
        };

        info!(
            status_code = ?first.status_code,
            parser_type = ?first.parser_type,
            "Received Oxylabs result"
        );

        let organic = extract_results(&first.content);
        if organic.is_empty() {
            if let Some(keys) = first.content.as_object().map(|o| o.keys().cloned().collect::<Vec<_>>()) {
                error!(?keys, "No organic results found in content");
            } else {
                error!("No organic results found in content");
            }
            return Err(ServiceError::NoOrganicResults);
        }

        info!(count = organic.len(), "Oxylabs returned organic results");
        Ok(filter_mexican_stores(organic))
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn name(&self) -> &str {
        "oxylabs"
    }
}
