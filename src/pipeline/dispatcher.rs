//! Concurrent fan-out of provider calls.
//!
//! Every submitted task yields exactly one finding, in submission order.
//! Failures are converted into degraded findings at the task boundary, so
//! a batch only fails as a whole when it cannot start.

use crate::error::ProviderError;
use crate::models::{Finding, Organization, SourceFamily};
use crate::pipeline::observer::PipelineObserver;
use crate::providers::{HttpSettings, ProviderRecord, ProviderRoutes};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::debug;

/// One provider call to make.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTask {
    pub organization: Organization,
    pub family: SourceFamily,
    pub query: String,
}

/// Result of a single fetch: a real finding or an error placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(Finding),
    Degraded(Finding),
}

impl FetchOutcome {
    fn from_result(task: &FetchTask, result: Result<ProviderRecord, ProviderError>) -> Self {
        match result {
            Ok(record) => FetchOutcome::Success(Finding::new(
                task.organization.clone(),
                Some(task.family),
                record.text,
                record.evidence,
            )),
            Err(e) => FetchOutcome::Degraded(Finding::degraded(
                task.organization.clone(),
                Some(task.family),
                e,
            )),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, FetchOutcome::Degraded(_))
    }

    pub fn into_finding(self) -> Finding {
        match self {
            FetchOutcome::Success(f) | FetchOutcome::Degraded(f) => f,
        }
    }
}

/// Bounded concurrent executor for fetch tasks.
///
/// Clones share the same concurrency ceiling.
#[derive(Clone)]
pub struct Dispatcher {
    permits: Arc<Semaphore>,
    http: HttpSettings,
    deadline: Option<Instant>,
    observer: Arc<dyn PipelineObserver>,
}

impl Dispatcher {
    pub fn new(
        max_concurrency: usize,
        http: HttpSettings,
        deadline: Option<Instant>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            http,
            deadline,
            observer,
        }
    }

    /// Run every task against its routed adapter.
    ///
    /// Errors only when the batch cannot start: the HTTP client cannot be
    /// built or an adapter refuses to prepare.
    pub async fn dispatch(
        &self,
        tasks: Vec<FetchTask>,
        routes: &ProviderRoutes,
    ) -> Result<Vec<FetchOutcome>, ProviderError> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        for adapter in routes.adapters() {
            adapter.prepare().await?;
        }

        // Scoped to this batch; dropped on every return path.
        let client = self.http.build_client()?;

        let futures = tasks.iter().map(|task| self.run_task(&client, task, routes));
        let outcomes = join_all(futures).await;

        debug!(
            tasks = outcomes.len(),
            degraded = outcomes.iter().filter(|o| o.is_degraded()).count(),
            "Dispatch batch complete"
        );

        Ok(outcomes)
    }

    async fn run_task(
        &self,
        client: &reqwest::Client,
        task: &FetchTask,
        routes: &ProviderRoutes,
    ) -> FetchOutcome {
        let call = self.fetch_one(client, task, routes);

        let result = match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, call)
                .await
                .unwrap_or(Err(ProviderError::DeadlineExceeded)),
            None => call.await,
        };

        let outcome = FetchOutcome::from_result(task, result);
        self.observer
            .fetch_completed(&task.organization, task.family, outcome.is_degraded());
        outcome
    }

    async fn fetch_one(
        &self,
        client: &reqwest::Client,
        task: &FetchTask,
        routes: &ProviderRoutes,
    ) -> Result<ProviderRecord, ProviderError> {
        let adapter = routes
            .route(task.family)
            .ok_or_else(|| ProviderError::NoRoute(task.family.to_string()))?;

        // The semaphore is never closed, so acquire cannot fail.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        adapter.fetch(client, &task.organization, &task.query).await
    }
}
