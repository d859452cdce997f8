//! Assertions over the final pipeline state.

use crate::core::RunStatus;
use crate::pipeline::PipelineState;

/// Asserts that the run completed.
pub fn assert_completed(state: &PipelineState) {
    assert_eq!(
        state.status,
        RunStatus::Completed,
        "Expected COMPLETED, got {} with errors: {:?}",
        state.status,
        state.errors
    );
}

/// Asserts that the run failed.
pub fn assert_failed(state: &PipelineState) {
    assert_eq!(
        state.status,
        RunStatus::Failed,
        "Expected FAILED, got {}",
        state.status
    );
}

/// Asserts that citations are index-aligned with documents and keyed
/// `[Ref-1]..[Ref-n]`.
pub fn assert_citations_aligned(state: &PipelineState) {
    assert_eq!(
        state.documents.len(),
        state.references.len(),
        "Documents and citations differ in length"
    );
    for (i, (doc, citation)) in state.documents.iter().zip(&state.references).enumerate() {
        assert_eq!(citation.key, format!("[Ref-{}]", i + 1));
        assert_eq!(
            citation.origin_id, doc.origin_id,
            "Citation {} points at the wrong document",
            citation.key
        );
    }
}
