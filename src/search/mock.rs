//! Mock provider for local development without Oxylabs credentials.

use async_trait::async_trait;
use tracing::info;

use super::filter::filter_mexican_stores;
use super::provider::{RawResult, SearchProvider};
use crate::error::ServiceError;

/// Mock provider that returns canned results shaped like real Oxylabs output.
///
/// Results still pass through the Mexican-store filter, so the foreign
/// entries in the sample data are dropped the same way real ones would be.
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        info!("Initializing MockProvider with sample store data");
        Self
    }

    fn sample_results(query: &str) -> Vec<RawResult> {
        let sample_data = [
            ("Walmart", "https://www.walmart.com.mx/ip/mock/0001", "$39.50"),
            ("Soriana", "https://www.soriana.com/mock/0002", "41.00 MXN"),
            ("Chedraui", "https://www.chedraui.com.mx/mock/0003", "$38.90"),
            ("Walmart", "https://www.walmart.com.mx/ip/mock/0004", "$44.00"),
            ("Carrefour", "https://www.carrefour.es/mock/0005", "2,10 EUR"),
            ("Heb", "https://www.heb.com.mx/mock/0006", ""),
        ];

        sample_data
            .iter()
            .map(|(merchant, url, price)| RawResult {
                title: format!("{query} - {merchant}"),
                price: price.to_string(),
                url: url.to_string(),
                desc: Some(format!("Compra {query} en {merchant}")),
                merchant: merchant.to_string(),
            })
            .collect()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for MockProvider {
    async fn search_shopping(&self, query: &str) -> Result<Vec<RawResult>, ServiceError> {
        if query.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("Query cannot be empty".into()));
        }

        let results = filter_mexican_stores(Self::sample_results(query));
        info!(query = %query, hits = results.len(), "Mock search completed");
        Ok(results)
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "mock"
    }
}
