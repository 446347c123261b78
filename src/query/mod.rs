//! Search query generation.
//!
//! Turns a research goal into concrete search strings per organization
//! and source family.

pub mod generator;

pub use generator::{GeneratorConfig, OllamaQueryGenerator};

use crate::error::GenerationError;
use crate::models::{Organization, SourceFamily};
use async_trait::async_trait;

/// Produces search queries for one (organization, source family) pair.
#[async_trait]
pub trait QueryGenerator: Send + Sync {
    async fn generate(
        &self,
        intent: &str,
        organization: &Organization,
        family: SourceFamily,
        n: usize,
    ) -> Result<Vec<String>, GenerationError>;
}
