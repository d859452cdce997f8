//! # Paperflow
//!
//! Turns a research topic into a rendered survey paper.
//!
//! A run moves through four stages, each wrapping one external collaborator:
//!
//! - **Retrieve**: search a bibliographic backend and keep relevant sources
//! - **Write**: draft the paper in one call or heading by heading
//! - **Refine**: polish the draft, best effort
//! - **Render**: persist the paper and describe the artifact
//!
//! Every stage reads the accumulated [`pipeline::PipelineState`] and returns a
//! delta; a per-stage failure policy decides whether a failure aborts the
//! run or is recorded and carried past.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use paperflow::prelude::*;
//! use std::sync::Arc;
//!
//! // Markdown files land in `rendering.output_dir` (`PAPERFLOW_OUTPUT_DIR`).
//! let orchestrator = Orchestrator::with_file_renderer(
//!     PaperflowConfig::default().with_env_overrides()?,
//!     Arc::new(ChatCompletionBackend::from_env()?),
//!     Arc::new(ArxivSearchBackend::new()?),
//! );
//!
//! let state = orchestrator.run(GenerationRequest::new("Graph Neural Networks")).await?;
//! println!("{}", state.summary().title);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss
)]

pub mod backends;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod overlap;
pub mod pipeline;
pub mod similarity;
pub mod stages;
pub mod testing;
pub mod utils;

pub use errors::{BackendError, PaperflowError};

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "http")]
    pub use crate::backends::{ArxivSearchBackend, ChatCompletionBackend};
    pub use crate::backends::{
        CompletionBackend, CompletionRequest, FileRenderBackend, RenderBackend, SearchBackend,
        SearchHit,
    };
    pub use crate::config::PaperflowConfig;
    pub use crate::core::{
        Citation, GenerationRequest, PaperSection, Phase, ProgressEvent, RunStatus, RunSummary,
        SourceDocument,
    };
    pub use crate::errors::{BackendError, ErrorCategory, PaperflowError};
    pub use crate::events::{ChannelEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::overlap::{OverlapChecker, OverlapMatch, OverlapReport};
    pub use crate::pipeline::{
        FailurePolicy, Orchestrator, PipelineState, RetryConfig, StagePolicies,
    };
    pub use crate::stages::{DraftMode, Stage};
}
