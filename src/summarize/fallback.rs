//! Offer normalization without AI.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::summarizer::{Analysis, Offer, DEFAULT_CURRENCY, OFFER_SOURCE};
use crate::search::RawResult;

/// Results inspected by the raw formatter.
const MAX_RAW_RESULTS: usize = 15;

lazy_static! {
    static ref NON_PRICE_CHARS: Regex = Regex::new(r"[^\d.,]").unwrap();
}

/// Parse a vendor price string such as `"$1,299.00"` or `"45 MXN"`.
///
/// Commas are treated as thousands separators. Zero, negative and
/// non-finite values are rejected.
pub fn normalize_price(raw: &str) -> Option<f64> {
    let cleaned = NON_PRICE_CHARS.replace_all(raw, "").replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
}

/// Price from a JSON value that may be a number or a formatted string.
pub fn price_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|p| p.is_finite() && *p > 0.0),
        Value::String(s) => normalize_price(s),
        _ => None,
    }
}

/// `link` if it is an absolute http(s) URL with a host.
pub fn valid_link(link: &str) -> Option<String> {
    let parsed = Url::parse(link.trim()).ok()?;
    let is_web = matches!(parsed.scheme(), "http" | "https");
    (is_web && parsed.host_str().is_some()).then(|| link.trim().to_string())
}

/// Build offers straight from search results: one per seller, first wins.
pub fn format_raw_results(results: &[RawResult]) -> Analysis {
    let mut seen_sellers = HashSet::new();
    let mut offers = Vec::new();

    for item in results.iter().take(MAX_RAW_RESULTS) {
        let seller = if item.merchant.trim().is_empty() {
            "Unknown".to_string()
        } else {
            item.merchant.clone()
        };

        if seen_sellers.contains(&seller) {
            continue;
        }

        let Some(price) = normalize_price(&item.price) else {
            debug!(title = %item.title, "Skipping result with no valid price");
            continue;
        };

        let Some(link) = valid_link(&item.url) else {
            debug!(title = %item.title, "Skipping result with no valid link");
            continue;
        };

        seen_sellers.insert(seller.clone());
        offers.push(Offer {
            title: if item.title.is_empty() {
                "Unknown Product".to_string()
            } else {
                item.title.clone()
            },
            price,
            currency: DEFAULT_CURRENCY.to_string(),
            seller,
            link,
            source: OFFER_SOURCE.to_string(),
        });
    }

    Analysis {
        summary: format!(
            "Found {} offers from Mexican stores (without AI analysis)",
            offers.len()
        ),
        offers,
        ai_generated: false,
    }
}
