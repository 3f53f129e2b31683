//! Heuristic extraction of results from loosely-structured Oxylabs content.
//!
//! The `content` field of a realtime result is either parsed JSON, a JSON
//! string, or raw HTML depending on the source and parser Oxylabs picked.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::provider::RawResult;

lazy_static! {
    static ref PRICE_PATTERNS: Vec<Regex> = [
        // $1,234.56 or $25.00
        r"\$\s*(\d+(?:,\d{3})*(?:\.\d{2})?)",
        // 1,234.56 MXN
        r"(\d+(?:,\d{3})*(?:\.\d{2})?)\s*(?:MXN|pesos?|mx)",
        // precio: $25.00
        r"precio:?\s*\$?\s*(\d+(?:,\d{3})*(?:\.\d{2})?)",
    ]
    .iter()
    .map(|p| RegexBuilder::new(p).case_insensitive(true).build().unwrap())
    .collect();
    static ref JSON_LD_SCRIPT: Regex = RegexBuilder::new(
        r#"<script[^>]*type=["']application/ld\+json["'][^>]*>(.*?)</script>"#
    )
    .case_insensitive(true)
    .dot_matches_new_line(true)
    .build()
    .unwrap();
}

/// Pull product-like results out of a realtime result's `content`.
pub fn extract_results(content: &Value) -> Vec<RawResult> {
    match content {
        Value::Object(_) => {
            let organic = organic_items(content);
            if !organic.is_empty() {
                info!(count = organic.len(), "Found organic results in parsed content");
            }
            transform_search_results(organic)
        }
        Value::String(raw) => extract_from_string(raw),
        _ => Vec::new(),
    }
}

fn extract_from_string(raw: &str) -> Vec<RawResult> {
    let mut results = Vec::new();

    if raw.trim_start().starts_with('{') {
        match serde_json::from_str::<Value>(raw) {
            Ok(parsed) => {
                let organic = organic_items(&parsed);
                info!(count = organic.len(), "Found organic results in JSON string content");
                results = transform_search_results(organic);
            }
            Err(e) => warn!(error = %e, "Content is not valid JSON, trying HTML"),
        }
    }

    if results.is_empty() && raw.to_lowercase().contains("<html") {
        results = parse_html_results(raw);
        info!(count = results.len(), "Parsed products from HTML JSON-LD");
    }

    if results.is_empty() && !raw.is_empty() {
        let preview: String = raw.chars().take(500).collect();
        warn!(preview = %preview, "String content yielded no results");
    }

    results
}

/// `results.organic`, falling back to a top-level `organic`.
fn organic_items(content: &Value) -> &[Value] {
    let nested = content
        .get("results")
        .and_then(|r| r.get("organic"))
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty());

    nested
        .or_else(|| content.get("organic").and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Turn Google Search organic items into product results.
///
/// Items without a usable absolute URL are skipped.
pub fn transform_search_results(items: &[Value]) -> Vec<RawResult> {
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let title = str_field(item, "title");
            let desc = str_field(item, "desc");
            let raw_url = obj
                .get("url")
                .or_else(|| obj.get("link"))
                .and_then(Value::as_str)
                .unwrap_or_default();

            let url = clean_url(raw_url)?;
            let merchant = merchant_from_url(&url);
            let price = extract_price_from_text(&format!("{desc} {title}")).unwrap_or_default();
            debug!(merchant = %merchant, url = %url, "Transformed search result");

            Some(RawResult {
                title,
                price,
                url,
                desc: Some(desc),
                merchant,
            })
        })
        .collect()
}

/// First price-looking number in `text`, without currency symbols.
pub fn extract_price_from_text(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }

    PRICE_PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Normalize a result URL, unwrapping Google `/url?q=` redirects.
///
/// Returns `None` for relative or otherwise unusable URLs.
pub fn clean_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_string());
    }

    if raw.starts_with("/url?") {
        let redirect = Url::parse("https://www.google.com").ok()?.join(raw).ok()?;
        return redirect
            .query_pairs()
            .find(|(key, _)| key == "q")
            .map(|(_, target)| target.into_owned())
            .filter(|target| target.starts_with("http"));
    }

    None
}

/// Merchant label from a URL: `https://www.walmart.com.mx/...` becomes `Walmart`.
pub fn merchant_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .map(|host| {
            let host = host.strip_prefix("www.").unwrap_or(&host);
            title_case(host.split('.').next().unwrap_or(host))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Extract `Product` entries from JSON-LD blocks embedded in raw HTML.
pub fn parse_html_results(html: &str) -> Vec<RawResult> {
    JSON_LD_SCRIPT
        .captures_iter(html)
        .filter_map(|caps| serde_json::from_str::<Value>(caps.get(1)?.as_str().trim()).ok())
        .flat_map(|block| match block {
            Value::Array(items) => items,
            other => vec![other],
        })
        .filter_map(|block| product_from_json_ld(&block))
        .collect()
}

fn product_from_json_ld(block: &Value) -> Option<RawResult> {
    if block.get("@type").and_then(Value::as_str) != Some("Product") {
        return None;
    }

    let title = str_field(block, "name");
    let price = block
        .get("offers")
        .and_then(|o| o.get("price"))
        .map(|p| match p {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        })
        .unwrap_or_default();

    if title.is_empty() || price.is_empty() {
        return None;
    }

    let merchant = block
        .get("brand")
        .and_then(|b| b.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();

    Some(RawResult {
        title,
        price,
        url: str_field(block, "url"),
        desc: None,
        merchant,
    })
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
