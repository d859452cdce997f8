//! Pipeline execution.
//!
//! This module provides:
//! - The accumulated run state and per-stage deltas
//! - The per-stage failure policy table
//! - Backend retry with backoff
//! - The sequential orchestrator with one-shot and streaming entry points

mod orchestrator;
mod policy;
mod retry;
mod state;


pub use orchestrator::Orchestrator;
pub use policy::{FailurePolicy, StagePolicies};
pub use retry::{
    is_retryable, should_retry, with_retry, BackoffStrategy, JitterStrategy, RetryConfig, RetryDecision,
};
pub use state::{
    DraftDelta, PipelineState, RefinementDelta, RenderDelta, RetrievalDelta, StageDelta,
};
