//! Data models for the research pipeline.
//!
//! This module contains the core records that flow through a run
//! (organizations, queries, findings, scored findings) and the
//! request/response documents exchanged with callers.

use crate::error::RequestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An organization under research, usually a domain name.
///
/// Partition key for deduplication. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Organization(String);

impl Organization {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The leading label of a domain ("acme" for "acme.com").
    pub fn company_name(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provenance channel of a finding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceFamily {
    Search,
    News,
    Jobs,
    Blogs,
    Articles,
}

impl SourceFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFamily::Search => "search",
            SourceFamily::News => "news",
            SourceFamily::Jobs => "jobs",
            SourceFamily::Blogs => "blogs",
            SourceFamily::Articles => "articles",
        }
    }
}

impl fmt::Display for SourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated search string tagged with what it is for.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub organization: Organization,
    pub family: SourceFamily,
    pub text: String,
}

/// One unit of evidence text plus its supporting URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub organization: Organization,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_family: Option<SourceFamily>,
    pub text: String,
    pub evidence: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Finding {
    pub fn new(
        organization: Organization,
        source_family: Option<SourceFamily>,
        text: impl Into<String>,
        evidence: Vec<String>,
    ) -> Self {
        Self {
            organization,
            source_family,
            text: text.into(),
            evidence,
            error: None,
        }
    }

    /// Placeholder for a fetch that failed: empty text and evidence.
    pub fn degraded(
        organization: Organization,
        source_family: Option<SourceFamily>,
        error: impl fmt::Display,
    ) -> Self {
        Self {
            organization,
            source_family,
            text: String::new(),
            evidence: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// Text length in characters.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A finding that passed the confidence threshold.
///
/// The evidence URLs are consumed by scoring; only their count survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredFinding {
    pub organization: Organization,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_family: Option<SourceFamily>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub confidence: f64,
    pub evidence_count: usize,
}

/// How many queries to generate per (organization, source family) pair.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Quick,
    #[default]
    Standard,
    Comprehensive,
}

impl SearchDepth {
    pub fn queries_per_source(&self) -> usize {
        match self {
            SearchDepth::Quick => 2,
            SearchDepth::Standard => 5,
            SearchDepth::Comprehensive => 8,
        }
    }
}

/// Pipeline input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub research_goal: String,
    #[serde(alias = "company_domains")]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub search_depth: SearchDepth,
    #[serde(default = "default_max_parallel_searches")]
    pub max_parallel_searches: usize,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

fn default_max_parallel_searches() -> usize {
    10
}

fn default_confidence_threshold() -> f64 {
    0.5
}

impl ResearchRequest {
    /// A request with default depth, parallelism and threshold.
    pub fn new(research_goal: impl Into<String>, organizations: Vec<String>) -> Self {
        Self {
            research_goal: research_goal.into(),
            organizations,
            search_depth: SearchDepth::default(),
            max_parallel_searches: default_max_parallel_searches(),
            confidence_threshold: default_confidence_threshold(),
        }
    }

    /// Reject malformed input. Nothing is fetched for an invalid request.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.research_goal.trim().is_empty() {
            return Err(RequestError::EmptyGoal);
        }

        if self.organizations.is_empty() {
            return Err(RequestError::NoOrganizations);
        }

        if let Some(pos) = self.organizations.iter().position(|o| o.trim().is_empty()) {
            return Err(RequestError::BlankOrganization(pos));
        }

        if self.max_parallel_searches == 0 {
            return Err(RequestError::InvalidParallelism);
        }

        // NaN fails the range check too
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(RequestError::InvalidThreshold(self.confidence_threshold));
        }

        Ok(())
    }

    /// Organizations in request order, with repeats removed.
    pub fn organizations(&self) -> Vec<Organization> {
        let mut orgs: Vec<Organization> = Vec::with_capacity(self.organizations.len());
        for raw in &self.organizations {
            let org = Organization::new(raw.as_str());
            if !orgs.contains(&org) {
                orgs.push(org);
            }
        }
        orgs
    }
}

/// One per-organization row of the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub organization: String,
    /// Batch-relative confidence in [0, 1]. Comparable only within one run.
    pub confidence_score: f64,
    pub evidence_count: usize,
    #[serde(rename = "findings")]
    pub findings_summary: String,
}

/// Batch statistics for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub success_rate: f64,
    pub avg_evidence_per_result: f64,
    /// Provider calls finished per second of run time.
    pub queries_per_second: f64,
    /// Share of cache lookups served from disk. 0 when caching is off.
    pub cache_hit_rate: f64,
    pub failed_requests: usize,
    pub failed_groups: usize,
}

/// The complete output of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    #[serde(rename = "research_id")]
    pub run_id: String,
    #[serde(rename = "total_organizations")]
    pub organization_count: usize,
    #[serde(rename = "strategies_generated")]
    pub queries_generated: usize,
    #[serde(rename = "searches_executed")]
    pub findings_attempted: usize,
    #[serde(rename = "processing_time_ms")]
    pub duration_ms: u64,
    pub results: Vec<ResearchResult>,
    #[serde(rename = "performance")]
    pub performance_stats: PerformanceStats,
    pub generated_at: DateTime<Utc>,
}
