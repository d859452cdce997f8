//! Testing utilities for paperflow pipelines.
//!
//! This module provides:
//! - Scripted collaborators that record their calls
//! - Fixtures for hits, requests and configuration
//! - Assertions over the final pipeline state

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_citations_aligned, assert_completed, assert_failed};
pub use fixtures::{sample_hits, sample_request, test_config};
pub use mocks::{MemoryRenderBackend, ScriptedCompletionBackend, StaticSearchBackend};
