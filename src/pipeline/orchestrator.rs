//! Drives one research run end to end.
//!
//! Stage order is fixed: generate queries, fetch (three isolated groups),
//! deduplicate, score, assemble. Each stage finishes before the next one
//! starts. Only an invalid request fails a run; everything downstream
//! degrades into a smaller, still valid report.

use crate::error::{GenerationError, GroupFailure, ProviderError, RequestError};
use crate::models::{Finding, Organization, PipelineReport, Query, ResearchRequest, SourceFamily};
use crate::pipeline::assembler::{assemble, RunMetrics};
use crate::pipeline::dedup::{dedupe, DEFAULT_SIMILARITY_THRESHOLD};
use crate::pipeline::dispatcher::{Dispatcher, FetchOutcome, FetchTask};
use crate::pipeline::observer::{PipelineObserver, Stage, TracingObserver};
use crate::pipeline::scoring::score;
use crate::providers::{CacheStats, HttpSettings, ProviderAdapter, ProviderRoutes};
use crate::query::QueryGenerator;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Tunables that are not part of the request.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Source families to generate search queries for.
    pub query_families: Vec<SourceFamily>,
    pub similarity_threshold: f64,
    /// Run-level deadline. `None` waits for every provider call.
    pub run_timeout: Option<Duration>,
    /// Extra time a fetch group gets past the deadline before it is aborted.
    pub group_grace: Duration,
    pub http: HttpSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            query_families: vec![
                SourceFamily::News,
                SourceFamily::Jobs,
                SourceFamily::Blogs,
                SourceFamily::Articles,
            ],
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            run_timeout: Some(Duration::from_secs(120)),
            group_grace: Duration::from_secs(5),
            http: HttpSettings::default(),
        }
    }
}

/// The adapters behind the three fetch groups.
#[derive(Clone)]
pub struct Providers {
    /// Routes generated queries by their source family.
    pub search: ProviderRoutes,
    pub news: Arc<dyn ProviderAdapter>,
    pub jobs: Arc<dyn ProviderAdapter>,
}

/// The three independent fetch groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchGroup {
    Search,
    News,
    Jobs,
}

impl FetchGroup {
    pub fn name(&self) -> &'static str {
        match self {
            FetchGroup::Search => "search",
            FetchGroup::News => "news",
            FetchGroup::Jobs => "jobs",
        }
    }
}

/// Flattened output of the fetch stage.
#[derive(Debug, Default)]
struct FetchSummary {
    findings: Vec<Finding>,
    failed_groups: usize,
}

pub struct Orchestrator {
    generator: Arc<dyn QueryGenerator>,
    providers: Providers,
    settings: PipelineSettings,
    observer: Arc<dyn PipelineObserver>,
    cache_stats: Option<Arc<CacheStats>>,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn QueryGenerator>,
        providers: Providers,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            generator,
            providers,
            settings,
            observer: Arc::new(TracingObserver),
            cache_stats: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Counters of the response cache the providers read through.
    pub fn with_cache_stats(mut self, stats: Arc<CacheStats>) -> Self {
        self.cache_stats = Some(stats);
        self
    }

    /// Absolute run deadline. A timeout too large to represent means none.
    fn deadline(&self) -> Option<Instant> {
        self.settings
            .run_timeout
            .and_then(|t| Instant::now().checked_add(t))
    }

    fn cache_snapshot(&self) -> (usize, usize) {
        self.cache_stats
            .as_ref()
            .map_or((0, 0), |stats| stats.snapshot())
    }

    /// Run the full pipeline for `request`.
    pub async fn run(&self, request: &ResearchRequest) -> Result<PipelineReport, RequestError> {
        request.validate()?;

        let started = std::time::Instant::now();
        let deadline = self.deadline();
        let organizations = request.organizations();

        info!(
            organizations = organizations.len(),
            depth = ?request.search_depth,
            threshold = request.confidence_threshold,
            "Starting research run"
        );

        self.observer.stage_started(Stage::GenerateQueries);
        let queries = self.queries_for(request, &organizations, deadline).await;

        self.observer.stage_started(Stage::Fetch);
        let dispatcher = Dispatcher::new(
            request.max_parallel_searches,
            self.settings.http.clone(),
            deadline,
            Arc::clone(&self.observer),
        );
        let queries_generated = queries.len();
        let (hits_before, lookups_before) = self.cache_snapshot();
        let fetched = self
            .fetch_all(&dispatcher, queries, &organizations, deadline)
            .await;
        let (hits_after, lookups_after) = self.cache_snapshot();

        let metrics_base = RunMetrics {
            organization_count: organizations.len(),
            queries_generated,
            findings_attempted: fetched.findings.len(),
            failed_requests: fetched.findings.iter().filter(|f| f.is_degraded()).count(),
            failed_groups: fetched.failed_groups,
            cache_hits: hits_after.saturating_sub(hits_before),
            cache_lookups: lookups_after.saturating_sub(lookups_before),
            elapsed: Duration::ZERO,
        };

        self.observer.stage_started(Stage::Deduplicate);
        let deduped = dedupe(
            fetched.findings,
            self.settings.similarity_threshold,
            self.observer.as_ref(),
        );
        debug!(clusters = deduped.len(), "Deduplication complete");

        self.observer.stage_started(Stage::Score);
        let scored = score(
            deduped,
            request.confidence_threshold,
            self.observer.as_ref(),
        );

        self.observer.stage_started(Stage::Assemble);
        let report = assemble(
            scored,
            &RunMetrics {
                elapsed: started.elapsed(),
                ..metrics_base
            },
        );

        info!(
            run_id = %report.run_id,
            results = report.results.len(),
            attempted = report.findings_attempted,
            duration_ms = report.duration_ms,
            "Research run complete"
        );

        Ok(report)
    }

    /// Generate queries only, without fetching anything.
    pub async fn plan(&self, request: &ResearchRequest) -> Result<Vec<Query>, RequestError> {
        request.validate()?;
        Ok(self
            .queries_for(request, &request.organizations(), self.deadline())
            .await)
    }

    /// One generation call per (organization, family) pair. A failed pair
    /// contributes no queries.
    async fn queries_for(
        &self,
        request: &ResearchRequest,
        organizations: &[Organization],
        deadline: Option<Instant>,
    ) -> Vec<Query> {
        let n = request.search_depth.queries_per_source();
        let intent = request.research_goal.as_str();

        let pairs: Vec<(Organization, SourceFamily)> = organizations
            .iter()
            .flat_map(|org| {
                self.settings
                    .query_families
                    .iter()
                    .map(move |family| (org.clone(), *family))
            })
            .collect();

        let per_pair: Vec<Vec<Query>> = stream::iter(pairs)
            .map(|(org, family)| async move {
                let call = self.generator.generate(intent, &org, family, n);
                let result = match deadline {
                    Some(deadline) => tokio::time::timeout_at(deadline, call)
                        .await
                        .unwrap_or(Err(GenerationError::DeadlineExceeded)),
                    None => call.await,
                };

                match result {
                    Ok(texts) => {
                        self.observer.queries_generated(&org, family, texts.len());
                        texts
                            .into_iter()
                            .map(|text| Query {
                                organization: org.clone(),
                                family,
                                text,
                            })
                            .collect::<Vec<_>>()
                    }
                    Err(e) => {
                        self.observer
                            .generation_failed(&org, family, &e.to_string());
                        Vec::new()
                    }
                }
            })
            .buffered(request.max_parallel_searches.max(1))
            .collect()
            .await;

        per_pair.into_iter().flatten().collect()
    }

    async fn fetch_all(
        &self,
        dispatcher: &Dispatcher,
        queries: Vec<Query>,
        organizations: &[Organization],
        deadline: Option<Instant>,
    ) -> FetchSummary {
        let search_tasks = queries
            .into_iter()
            .map(|q| FetchTask {
                organization: q.organization,
                family: q.family,
                query: q.text,
            })
            .collect();

        let groups = vec![
            (FetchGroup::Search, search_tasks, self.providers.search.clone()),
            (
                FetchGroup::News,
                per_organization_tasks(organizations, SourceFamily::News),
                ProviderRoutes::new().with(SourceFamily::News, Arc::clone(&self.providers.news)),
            ),
            (
                FetchGroup::Jobs,
                per_organization_tasks(organizations, SourceFamily::Jobs),
                ProviderRoutes::new().with(SourceFamily::Jobs, Arc::clone(&self.providers.jobs)),
            ),
        ];

        // Spawn all groups before awaiting any of them.
        let handles: Vec<(FetchGroup, JoinHandle<Result<Vec<FetchOutcome>, ProviderError>>)> =
            groups
                .into_iter()
                .map(|(group, tasks, routes)| {
                    let dispatcher = dispatcher.clone();
                    let handle =
                        tokio::spawn(async move { dispatcher.dispatch(tasks, &routes).await });
                    (group, handle)
                })
                .collect();

        let group_deadline = deadline.and_then(|d| d.checked_add(self.settings.group_grace));
        let mut summary = FetchSummary::default();

        for (group, handle) in handles {
            match join_group(handle, group_deadline).await {
                Ok(outcomes) => {
                    let degraded = outcomes.iter().filter(|o| o.is_degraded()).count();
                    self.observer
                        .batch_fetched(group.name(), outcomes.len(), degraded);
                    summary
                        .findings
                        .extend(outcomes.into_iter().map(FetchOutcome::into_finding));
                }
                Err(failure) => {
                    self.observer
                        .group_failed(group.name(), &failure.to_string());
                    summary.failed_groups += 1;
                }
            }
        }

        summary
    }
}

fn per_organization_tasks(organizations: &[Organization], family: SourceFamily) -> Vec<FetchTask> {
    organizations
        .iter()
        .map(|org| FetchTask {
            organization: org.clone(),
            family,
            query: org.to_string(),
        })
        .collect()
}

/// Wait for one group, turning every way it can go wrong into a [`GroupFailure`].
async fn join_group(
    mut handle: JoinHandle<Result<Vec<FetchOutcome>, ProviderError>>,
    deadline: Option<Instant>,
) -> Result<Vec<FetchOutcome>, GroupFailure> {
    let joined = match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                return Err(GroupFailure::TimedOut);
            }
        },
        None => handle.await,
    };

    match joined {
        Ok(Ok(outcomes)) => Ok(outcomes),
        Ok(Err(e)) => Err(GroupFailure::Setup(e.to_string())),
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(GroupFailure::Panicked(message))
        }
        Err(e) => Err(GroupFailure::Panicked(e.to_string())),
    }
}
