//! Price-check relay library.
//!
//! This library exposes the core modules for integration testing while
//! keeping the actual binary entry point in main.rs.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod query;
pub mod search;
pub mod server;
pub mod summarize;
