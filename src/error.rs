//! Error taxonomy for the research pipeline.
//!
//! Only [`RequestError`] is fatal. Every other error here is recovered
//! locally by the stage that produced it and degrades the run instead of
//! aborting it.

use thiserror::Error;

/// A single data-source call failed.
///
/// Converted into a degraded finding at the dispatcher boundary.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} is not configured (missing API key)")]
    NotConfigured(&'static str),

    #[error("request failed: {0}")]
    Request(String),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider payload: {0}")]
    Malformed(String),

    #[error("no provider registered for source family '{0}'")]
    NoRoute(String),

    #[error("run deadline exceeded before the fetch completed")]
    DeadlineExceeded,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Request(format!("timed out: {}", e))
        } else if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Request(e.to_string())
        }
    }
}

/// Query generation failed for one (organization, source family) pair.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("query generation request failed: {0}")]
    Request(String),

    #[error("query generator returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed query generator response: {0}")]
    Malformed(String),

    #[error("run deadline exceeded during query generation")]
    DeadlineExceeded,
}

/// An entire fetch group failed before producing findings.
#[derive(Debug, Error)]
pub enum GroupFailure {
    #[error("group setup failed: {0}")]
    Setup(String),

    #[error("group task panicked: {0}")]
    Panicked(String),

    #[error("group did not finish before the run deadline")]
    TimedOut,
}

/// Invalid pipeline input. Rejected before any fetch work begins.
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("research goal must not be empty")]
    EmptyGoal,

    #[error("at least one organization is required")]
    NoOrganizations,

    #[error("organization at position {0} is blank")]
    BlankOrganization(usize),

    #[error("max_parallel_searches must be at least 1")]
    InvalidParallelism,

    #[error("confidence_threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
}
