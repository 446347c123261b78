//! The research pipeline: query generation, fetch, dedup, scoring, assembly.

pub mod assembler;
pub mod dedup;
pub mod dispatcher;
pub mod observer;
pub mod orchestrator;
pub mod scoring;

pub use dedup::DEFAULT_SIMILARITY_THRESHOLD;
pub use observer::{PipelineObserver, Stage, TracingObserver};
pub use orchestrator::{Orchestrator, PipelineSettings, Providers};
