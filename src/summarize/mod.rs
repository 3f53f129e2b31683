//! Normalization of search results into price offers.
//!
//! - `GeminiSummarizer` - AI summarization via the Gemini REST API
//! - `format_raw_results` - Deterministic fallback used whenever the AI is unavailable

pub mod fallback;
mod gemini;
mod summarizer;

pub use fallback::format_raw_results;
pub use gemini::GeminiSummarizer;
pub use summarizer::{Analysis, Offer, PriceRange, Summarizer};
