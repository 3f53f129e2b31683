//! Summarizer trait and the normalized offer types it produces.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::search::RawResult;

pub const DEFAULT_CURRENCY: &str = "MXN";
pub const OFFER_SOURCE: &str = "oxylabs_shopping";

/// A normalized price offer returned to the extension.
///
/// `price` is always finite and positive, `link` always an absolute http(s) URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub title: String,
    pub price: f64,
    pub currency: String,
    pub seller: String,
    pub link: String,
    pub source: String,
}

/// Lowest and highest offer price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn from_offers(offers: &[Offer]) -> Option<Self> {
        let mut prices = offers.iter().map(|o| o.price);
        let first = prices.next()?;
        Some(prices.fold(PriceRange { min: first, max: first }, |range, p| PriceRange {
            min: range.min.min(p),
            max: range.max.max(p),
        }))
    }
}

/// Summarizer output.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub offers: Vec<Offer>,
    pub summary: String,
    /// Whether the offers came from the AI rather than the raw formatter
    pub ai_generated: bool,
}

/// Trait defining the interface for result summarization.
///
/// Implementations include:
/// - `GeminiSummarizer` - Gemini generateContent with raw-formatting fallback
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Turn raw search results into normalized offers.
    ///
    /// Never fails: implementations fall back to `format_raw_results`.
    async fn analyze(&self, results: &[RawResult], query: &str) -> Analysis;

    /// Whether the AI backend is usable. `None` until the first analysis resolves it.
    fn is_available(&self) -> Option<bool>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(price: f64) -> Offer {
        Offer {
            title: "t".into(),
            price,
            currency: DEFAULT_CURRENCY.into(),
            seller: "s".into(),
            link: "https://example.com.mx".into(),
            source: OFFER_SOURCE.into(),
        }
    }

    #[test]
    fn test_price_range() {
        let range = PriceRange::from_offers(&[offer(40.0), offer(12.5), offer(99.9)]).unwrap();
        assert_eq!(range.min, 12.5);
        assert_eq!(range.max, 99.9);
    }

    #[test]
    fn test_price_range_empty() {
        assert!(PriceRange::from_offers(&[]).is_none());
    }
}
