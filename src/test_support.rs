//! In-memory fakes shared by the unit tests.

use crate::error::{GenerationError, ProviderError};
use crate::models::{Organization, SourceFamily};
use crate::pipeline::observer::{PipelineObserver, Stage};
use crate::providers::{ProviderAdapter, ProviderRecord, ResponseCache};
use crate::query::QueryGenerator;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Returns `"<name> result for <query>"` and one URL, or a canned record.
pub struct StaticAdapter {
    name: &'static str,
    responses: HashMap<String, ProviderRecord>,
    prepared: bool,
}

impl StaticAdapter {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            responses: HashMap::new(),
            prepared: true,
        }
    }

    pub fn with_response(mut self, query: &str, text: &str, evidence: &[&str]) -> Self {
        self.responses.insert(
            query.to_string(),
            ProviderRecord {
                text: text.to_string(),
                evidence: evidence.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    /// Make `prepare` fail as if no API key were configured.
    pub fn unprepared(mut self) -> Self {
        self.prepared = false;
        self
    }
}

#[async_trait]
impl ProviderAdapter for StaticAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn prepare(&self) -> Result<(), ProviderError> {
        if self.prepared {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(self.name))
        }
    }

    async fn fetch(
        &self,
        _client: &reqwest::Client,
        _organization: &Organization,
        query: &str,
    ) -> Result<ProviderRecord, ProviderError> {
        Ok(self.responses.get(query).cloned().unwrap_or_else(|| ProviderRecord {
            text: format!("{} result for {}", self.name, query),
            evidence: vec![format!("https://{}.test/{}", self.name, query.replace(' ', "-"))],
        }))
    }
}

/// Every fetch fails with a 503.
pub struct FailingAdapter {
    name: &'static str,
}

impl FailingAdapter {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl ProviderAdapter for FailingAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(
        &self,
        _client: &reqwest::Client,
        _organization: &Organization,
        _query: &str,
    ) -> Result<ProviderRecord, ProviderError> {
        Err(ProviderError::Status {
            status: 503,
            body: "service unavailable".to_string(),
        })
    }
}

/// Panics on every fetch, taking its whole group down.
pub struct PanickingAdapter;

#[async_trait]
impl ProviderAdapter for PanickingAdapter {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn fetch(
        &self,
        _client: &reqwest::Client,
        _organization: &Organization,
        _query: &str,
    ) -> Result<ProviderRecord, ProviderError> {
        panic!("provider exploded")
    }
}

/// Sleeps before answering and tracks peak concurrency.
pub struct SlowAdapter {
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowAdapter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for SlowAdapter {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn fetch(
        &self,
        _client: &reqwest::Client,
        _organization: &Organization,
        query: &str,
    ) -> Result<ProviderRecord, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(ProviderRecord {
            text: format!("slow result for {}", query),
            evidence: Vec::new(),
        })
    }
}

/// Reads through a [`ResponseCache`] keyed by `<name>://<query>`.
pub struct CachingAdapter {
    name: &'static str,
    cache: ResponseCache,
}

impl CachingAdapter {
    pub fn new(name: &'static str, cache: ResponseCache) -> Self {
        Self { name, cache }
    }
}

#[async_trait]
impl ProviderAdapter for CachingAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(
        &self,
        _client: &reqwest::Client,
        _organization: &Organization,
        query: &str,
    ) -> Result<ProviderRecord, ProviderError> {
        let key = format!("{}://{}", self.name, query);
        let text = match self.cache.get(&key).await {
            Some(body) => body,
            None => {
                let body = format!("{} result for {}", self.name, query);
                self.cache.put(&key, &body).await;
                body
            }
        };

        Ok(ProviderRecord {
            text,
            evidence: vec![key],
        })
    }
}

/// Returns `"<org> <family> query <i>"` strings; selected families fail.
#[derive(Default)]
pub struct StaticGenerator {
    failing: HashSet<SourceFamily>,
}

impl StaticGenerator {
    pub fn failing_for(families: &[SourceFamily]) -> Self {
        Self {
            failing: families.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl QueryGenerator for StaticGenerator {
    async fn generate(
        &self,
        _intent: &str,
        organization: &Organization,
        family: SourceFamily,
        n: usize,
    ) -> Result<Vec<String>, GenerationError> {
        if self.failing.contains(&family) {
            return Err(GenerationError::Status {
                status: 500,
                body: "model unavailable".to_string(),
            });
        }

        Ok((0..n)
            .map(|i| format!("{} {} query {}", organization, family, i))
            .collect())
    }
}

/// Discards every event.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Records a compact line per event.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn push(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl PipelineObserver for RecordingObserver {
    fn stage_started(&self, stage: Stage) {
        self.push(format!("stage {}", stage.label()));
    }

    fn generation_failed(&self, org: &Organization, family: SourceFamily, _error: &str) {
        self.push(format!("generation-failed {} {}", org, family));
    }

    fn group_failed(&self, group: &str, _error: &str) {
        self.push(format!("group-failed {}", group));
    }

    fn cluster_merged(&self, org: &Organization, members: usize) {
        self.push(format!("cluster {} {}", org, members));
    }
}
