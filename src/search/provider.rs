//! Provider trait defining the interface for shopping searches.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// A single vendor search result, before normalization into an offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    pub title: String,
    /// Price as found in the vendor payload; empty when none was detected
    pub price: String,
    /// Absolute product URL
    pub url: String,
    /// Search snippet, kept as context for the summarizer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    pub merchant: String,
}

/// Trait defining the interface for search vendors.
///
/// Implementations include:
/// - `OxylabsProvider` - Google Search through the Oxylabs realtime API
/// - `MockProvider` - Canned results for local development and tests
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for offers of a product, restricted to Mexican retailers.
    ///
    /// # Returns
    /// Filtered results in vendor order; an empty list when the vendor had nothing.
    async fn search_shopping(&self, query: &str) -> Result<Vec<RawResult>, ServiceError>;

    /// Check whether the provider has the credentials it needs.
    fn is_configured(&self) -> bool;

    /// Short provider name used in `powered_by`.
    fn name(&self) -> &str;
}
