//! Shopping search against vendor APIs.
//!
//! This module provides a `SearchProvider` trait and implementations:
//! - `OxylabsProvider` - Google Search via the Oxylabs realtime API
//! - `MockProvider` - Canned results for development

pub mod extract;
pub mod filter;
mod mock;
mod oxylabs;
mod provider;

pub use filter::filter_mexican_stores;
pub use mock::MockProvider;
pub use oxylabs::OxylabsProvider;
pub use provider::{RawResult, SearchProvider};
