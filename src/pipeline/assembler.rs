//! Maps scored findings and run counters into the response document.

use crate::models::{PerformanceStats, PipelineReport, ResearchResult, ScoredFinding};
use chrono::Utc;
use std::time::Duration;
use uuid::Uuid;

/// Counters collected by the orchestrator along the way.
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    pub organization_count: usize,
    pub queries_generated: usize,
    pub findings_attempted: usize,
    pub failed_requests: usize,
    pub failed_groups: usize,
    pub cache_hits: usize,
    pub cache_lookups: usize,
    pub elapsed: Duration,
}

/// Build the final report. Pure apart from the fresh run id and timestamp.
pub fn assemble(scored: Vec<ScoredFinding>, metrics: &RunMetrics) -> PipelineReport {
    let scored_count = scored.len();
    let total_evidence: usize = scored.iter().map(|s| s.evidence_count).sum();

    let results: Vec<ResearchResult> = scored
        .into_iter()
        .map(|s| ResearchResult {
            organization: s.organization.to_string(),
            confidence_score: s.confidence,
            evidence_count: s.evidence_count,
            findings_summary: s.text,
        })
        .collect();

    let performance_stats = PerformanceStats {
        success_rate: round2(scored_count as f64 / metrics.findings_attempted.max(1) as f64),
        avg_evidence_per_result: round2(total_evidence as f64 / scored_count.max(1) as f64),
        queries_per_second: round2(queries_per_second(metrics)),
        cache_hit_rate: round2(metrics.cache_hits as f64 / metrics.cache_lookups.max(1) as f64),
        failed_requests: metrics.failed_requests,
        failed_groups: metrics.failed_groups,
    };

    PipelineReport {
        run_id: new_run_id(),
        organization_count: metrics.organization_count,
        queries_generated: metrics.queries_generated,
        findings_attempted: metrics.findings_attempted,
        duration_ms: u64::try_from(metrics.elapsed.as_millis()).unwrap_or(u64::MAX),
        results,
        performance_stats,
        generated_at: Utc::now(),
    }
}

/// Zero for a run that took no measurable time.
fn queries_per_second(metrics: &RunMetrics) -> f64 {
    let secs = metrics.elapsed.as_secs_f64();
    if secs > 0.0 {
        metrics.findings_attempted as f64 / secs
    } else {
        0.0
    }
}

fn new_run_id() -> String {
    format!("research-{}", Uuid::new_v4())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
