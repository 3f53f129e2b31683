//! Request parsing and search-query cleanup.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::error::ServiceError;

lazy_static! {
    static ref NON_DIGIT: Regex = Regex::new(r"\D+").unwrap();
    static ref PUNCTUATION: Regex = Regex::new(r"[^\w\s.]").unwrap();
}

/// Spanish filler words that drown out product names in Google results.
const FILLER_WORDS: &[&str] = &[
    "con", "de", "el", "la", "los", "las", "un", "una", "unos", "unas", "bebida", "producto",
    "articulo", "pack", "paquete", "sabor", "hidratante", "electrolitos", "vitamina", "tubo",
    "tabletas", "efervecentes", "capsulas",
];

const MAX_QUERY_WORDS: usize = 5;

/// Body of `POST /check_price`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckPriceRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub query: String,
    /// UPC digits; extensions send it as either a string or a number.
    #[serde(default, deserialize_with = "lenient_string")]
    pub upc: String,
    /// `None` only when the key is absent; an explicit `null` is kept.
    #[serde(default, deserialize_with = "present_value")]
    pub search_type: Option<serde_json::Value>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Shopping,
}

impl SearchType {
    /// Parse the optional `search_type` field; absent means shopping.
    ///
    /// Any present value other than the string `"shopping"`, `null` included,
    /// is unsupported.
    pub fn parse(raw: Option<&serde_json::Value>) -> Result<Self, ServiceError> {
        match raw {
            None => Ok(SearchType::Shopping),
            Some(serde_json::Value::String(s)) if s.trim() == "shopping" => Ok(SearchType::Shopping),
            Some(other) => Err(ServiceError::UnsupportedSearchType(other.to_string())),
        }
    }
}

/// A validated price-check query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    pub text: String,
    pub upc: String,
    pub search_type: SearchType,
    /// Combined text sent downstream
    pub search_query: String,
}

impl TryFrom<CheckPriceRequest> for PriceQuery {
    type Error = ServiceError;

    fn try_from(req: CheckPriceRequest) -> Result<Self, Self::Error> {
        let text = req.query.trim().to_string();
        let upc = clean_upc(&req.upc);

        let search_query = build_search_query(&text, &upc)
            .ok_or_else(|| ServiceError::InvalidRequest("query or upc required".to_string()))?;
        let search_type = SearchType::parse(req.search_type.as_ref())?;

        Ok(PriceQuery {
            text,
            upc,
            search_type,
            search_query,
        })
    }
}

/// Strip everything that is not an ASCII digit.
pub fn clean_upc(raw: &str) -> String {
    NON_DIGIT.replace_all(raw, "").into_owned()
}

/// Combine free text and UPC; `None` when both are empty.
pub fn build_search_query(query: &str, upc: &str) -> Option<String> {
    match (query.is_empty(), upc.is_empty()) {
        (true, true) => None,
        (false, true) => Some(query.to_string()),
        (true, false) => Some(format!("UPC {upc}")),
        (false, false) => Some(format!("{query} UPC {upc}")),
    }
}

/// Reduce a product title to at most five meaningful lowercase words.
///
/// Returns the original query when every word is filtered out.
pub fn simplify_query(query: &str) -> String {
    let cleaned = query.replace(['\u{2013}', '\u{2014}'], " ");
    let cleaned = PUNCTUATION.replace_all(&cleaned, " ").to_lowercase();

    let important: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|w| !FILLER_WORDS.contains(w) && w.chars().count() > 2)
        .take(MAX_QUERY_WORDS)
        .collect();

    if important.is_empty() {
        query.to_string()
    } else {
        important.join(" ")
    }
}

/// Query string sent to Google through Oxylabs, restricted to Mexican sites.
pub fn provider_query(query: &str) -> String {
    format!("{} precio site:.mx", simplify_query(query))
}
