//! Shared application state with lazily constructed vendor clients.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use crate::config::Config;
use crate::error::ServiceError;
use crate::search::{MockProvider, OxylabsProvider, SearchProvider};
use crate::summarize::{GeminiSummarizer, Summarizer};

/// Vendor clients, each built on first use and shared afterwards.
pub struct Services {
    config: Arc<Config>,
    search: OnceCell<Arc<dyn SearchProvider>>,
    summarizer: OnceCell<Arc<dyn Summarizer>>,
}

impl Services {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            search: OnceCell::new(),
            summarizer: OnceCell::new(),
        }
    }

    /// Services with pre-built clients.
    pub fn with_clients(
        config: Arc<Config>,
        search: Arc<dyn SearchProvider>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            config,
            search: OnceCell::new_with(Some(search)),
            summarizer: OnceCell::new_with(Some(summarizer)),
        }
    }

    pub async fn search(&self) -> Result<Arc<dyn SearchProvider>, ServiceError> {
        self.search
            .get_or_try_init(|| async { build_search_provider(&self.config) })
            .await
            .map(Arc::clone)
    }

    pub async fn summarizer(&self) -> Result<Arc<dyn Summarizer>, ServiceError> {
        self.summarizer
            .get_or_try_init(|| async { build_summarizer(&self.config) })
            .await
            .map(Arc::clone)
    }

    pub fn search_loaded(&self) -> bool {
        self.search.initialized()
    }

    pub fn summarizer_loaded(&self) -> bool {
        self.summarizer.initialized()
    }
}

fn build_search_provider(config: &Config) -> Result<Arc<dyn SearchProvider>, ServiceError> {
    if config.mock_vendors {
        info!("MOCK_VENDORS=true: Using mock search provider");
        return Ok(Arc::new(MockProvider::new()));
    }
    Ok(Arc::new(OxylabsProvider::new(config)?))
}

fn build_summarizer(config: &Config) -> Result<Arc<dyn Summarizer>, ServiceError> {
    info!(configured = config.gemini_configured(), "Loading Gemini summarizer");
    Ok(Arc::new(GeminiSummarizer::new(config)?))
}

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub services: Arc<Services>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        Self {
            services: Arc::new(Services::new(Arc::clone(&config))),
            config,
        }
    }

    pub fn with_services(config: Arc<Config>, services: Services) -> Self {
        Self {
            config,
            services: Arc::new(services),
        }
    }
}
