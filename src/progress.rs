//! Terminal progress display for a research run.

use crate::models::{Organization, SourceFamily};
use crate::pipeline::{PipelineObserver, Stage, TracingObserver};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Spinner fed by pipeline events. Every event is also forwarded to
/// [`TracingObserver`] so logs stay complete.
pub struct ProgressObserver {
    bar: ProgressBar,
    degraded: AtomicUsize,
    logs: TracingObserver,
}

impl ProgressObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg} ({pos} provider calls)")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));

        Self {
            bar,
            degraded: AtomicUsize::new(0),
            logs: TracingObserver,
        }
    }

    /// Stop the spinner and leave a one-line summary behind.
    pub fn finish(&self) {
        let degraded = self.degraded.load(Ordering::Relaxed);
        let message = if degraded == 0 {
            "Research complete".to_string()
        } else {
            format!("Research complete, {} provider call(s) failed", degraded)
        };
        self.bar.finish_with_message(message);
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineObserver for ProgressObserver {
    fn stage_started(&self, stage: Stage) {
        self.bar.set_message(stage.label());
        self.logs.stage_started(stage);
    }

    fn queries_generated(&self, org: &Organization, family: SourceFamily, count: usize) {
        self.logs.queries_generated(org, family, count);
    }

    fn generation_failed(&self, org: &Organization, family: SourceFamily, error: &str) {
        self.logs.generation_failed(org, family, error);
    }

    fn fetch_completed(&self, org: &Organization, family: SourceFamily, degraded: bool) {
        if degraded {
            self.degraded.fetch_add(1, Ordering::Relaxed);
        }
        self.bar.inc(1);
        self.logs.fetch_completed(org, family, degraded);
    }

    fn batch_fetched(&self, group: &str, findings: usize, degraded: usize) {
        self.logs.batch_fetched(group, findings, degraded);
    }

    fn group_failed(&self, group: &str, error: &str) {
        self.logs.group_failed(group, error);
    }

    fn cluster_merged(&self, org: &Organization, members: usize) {
        self.logs.cluster_merged(org, members);
    }

    fn finding_scored(&self, org: &Organization, confidence: f64, kept: bool) {
        self.logs.finding_scored(org, confidence, kept);
    }
}
