//! Core domain model types for paperflow.
//!
//! This module contains the fundamental types shared by every stage:
//! - Run status and pipeline phase enums
//! - The request, source, citation and section records
//! - Progress events and artifact descriptors

mod artifact;
mod event;
mod model;
mod status;

pub use artifact::{ArtifactDescriptor, RenderDocument, RenderedArtifact};
pub use event::{ProgressEvent, RunSummary, NO_ABSTRACT, UNTITLED};
pub use model::{Citation, GenerationRequest, PaperSection, SourceDocument};
pub use status::{Phase, RunStatus};
