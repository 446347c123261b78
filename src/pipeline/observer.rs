//! Stage-boundary events emitted by the pipeline.
//!
//! The core never prints. Callers plug in an observer to get progress:
//! the CLI uses a progress bar, everything else defaults to tracing.

use crate::models::{Organization, SourceFamily};
use tracing::{debug, info, warn};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    GenerateQueries,
    Fetch,
    Deduplicate,
    Score,
    Assemble,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::GenerateQueries => "generating queries",
            Stage::Fetch => "fetching signals",
            Stage::Deduplicate => "deduplicating findings",
            Stage::Score => "scoring findings",
            Stage::Assemble => "assembling report",
        }
    }
}

/// Receives pipeline events. Every method has a no-op default.
pub trait PipelineObserver: Send + Sync {
    fn stage_started(&self, _stage: Stage) {}

    fn queries_generated(&self, _org: &Organization, _family: SourceFamily, _count: usize) {}

    fn generation_failed(&self, _org: &Organization, _family: SourceFamily, _error: &str) {}

    fn fetch_completed(&self, _org: &Organization, _family: SourceFamily, _degraded: bool) {}

    fn batch_fetched(&self, _group: &str, _findings: usize, _degraded: usize) {}

    fn group_failed(&self, _group: &str, _error: &str) {}

    fn cluster_merged(&self, _org: &Organization, _members: usize) {}

    fn finding_scored(&self, _org: &Organization, _confidence: f64, _kept: bool) {}
}

/// Logs events through `tracing`.
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn stage_started(&self, stage: Stage) {
        info!("Stage: {}", stage.label());
    }

    fn queries_generated(&self, org: &Organization, family: SourceFamily, count: usize) {
        debug!(organization = %org, family = %family, count, "Queries generated");
    }

    fn generation_failed(&self, org: &Organization, family: SourceFamily, error: &str) {
        warn!(organization = %org, family = %family, error, "Query generation failed");
    }

    fn batch_fetched(&self, group: &str, findings: usize, degraded: usize) {
        info!(group, findings, degraded, "Fetch group finished");
    }

    fn group_failed(&self, group: &str, error: &str) {
        warn!(group, error, "Fetch group failed, continuing without it");
    }

    fn cluster_merged(&self, org: &Organization, members: usize) {
        debug!(organization = %org, members, "Merged near-duplicate findings");
    }

    fn finding_scored(&self, org: &Organization, confidence: f64, kept: bool) {
        debug!(organization = %org, confidence, kept, "Finding scored");
    }
}
