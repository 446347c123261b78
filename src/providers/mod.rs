//! Data-source adapters.
//!
//! Each adapter turns one (organization, query) pair into a finding-shaped
//! record or an error. Adapters never retry and never swallow errors; the
//! dispatcher decides what a failure means for the run.

pub mod bing;
pub mod cache;
pub mod http;
pub mod jobs;

pub use bing::{BingNews, BingWebSearch};
pub use cache::{CacheStats, ResponseCache};
pub use jobs::JobBoard;

use crate::error::ProviderError;
use crate::models::{Organization, SourceFamily};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// What a provider returns for one call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderRecord {
    pub text: String,
    pub evidence: Vec<String>,
}

/// A single external data source.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Called once per dispatch batch before any fetch.
    ///
    /// An error here fails the whole batch.
    async fn prepare(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn fetch(
        &self,
        client: &reqwest::Client,
        organization: &Organization,
        query: &str,
    ) -> Result<ProviderRecord, ProviderError>;
}

/// Source family to adapter routing table.
#[derive(Clone, Default)]
pub struct ProviderRoutes {
    routes: HashMap<SourceFamily, Arc<dyn ProviderAdapter>>,
}

impl ProviderRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `family` to `adapter`, replacing any previous route.
    pub fn with(mut self, family: SourceFamily, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.routes.insert(family, adapter);
        self
    }

    /// Route every family in `families` to the same adapter.
    pub fn with_all(
        mut self,
        families: &[SourceFamily],
        adapter: Arc<dyn ProviderAdapter>,
    ) -> Self {
        for family in families {
            self.routes.insert(*family, Arc::clone(&adapter));
        }
        self
    }

    pub fn route(&self, family: SourceFamily) -> Option<&Arc<dyn ProviderAdapter>> {
        self.routes.get(&family)
    }

    /// Distinct adapters in this table.
    pub fn adapters(&self) -> Vec<Arc<dyn ProviderAdapter>> {
        let mut unique: Vec<Arc<dyn ProviderAdapter>> = Vec::new();
        for adapter in self.routes.values() {
            if !unique.iter().any(|a| Arc::ptr_eq(a, adapter)) {
                unique.push(Arc::clone(adapter));
            }
        }
        unique
    }
}

/// Settings for the HTTP client built for each dispatch batch.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: format!("signalscout/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpSettings {
    pub fn build_client(&self) -> Result<reqwest::Client, ProviderError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to create HTTP client: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticAdapter;

    #[test]
    fn test_routes_share_adapters() {
        let web: Arc<dyn ProviderAdapter> = Arc::new(StaticAdapter::new("web"));
        let news: Arc<dyn ProviderAdapter> = Arc::new(StaticAdapter::new("news"));

        let routes = ProviderRoutes::new()
            .with_all(&[SourceFamily::Blogs, SourceFamily::Articles], web)
            .with(SourceFamily::News, news);

        assert_eq!(routes.route(SourceFamily::Blogs).map(|a| a.name()), Some("web"));
        assert_eq!(routes.route(SourceFamily::News).map(|a| a.name()), Some("news"));
        assert!(routes.route(SourceFamily::Jobs).is_none());
        assert_eq!(routes.adapters().len(), 2);
    }

    #[test]
    fn test_build_client() {
        assert!(HttpSettings::default().build_client().is_ok());
    }
}
