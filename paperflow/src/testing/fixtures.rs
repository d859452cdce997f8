//! Fixtures for pipeline tests.

use crate::backends::SearchHit;
use crate::config::PaperflowConfig;
use crate::core::GenerationRequest;
use crate::pipeline::RetryConfig;

/// Returns `count` hits that all pass the relevance filter for `topic`.
#[must_use]
pub fn sample_hits(topic: &str, count: usize) -> Vec<SearchHit> {
    (1..=count)
        .map(|i| {
            SearchHit::new(
                format!("{topic}: Study {i}"),
                format!("We investigate {topic} from perspective number {i}."),
                format!("http://arxiv.org/abs/2401.{i:05}v1"),
                format!("http://arxiv.org/pdf/2401.{i:05}v1"),
            )
        })
        .collect()
}

/// Returns a request with default length and reference settings.
#[must_use]
pub fn sample_request(topic: &str) -> GenerationRequest {
    GenerationRequest::new(topic)
}

/// Returns the default configuration with backend retries disabled.
#[must_use]
pub fn test_config() -> PaperflowConfig {
    PaperflowConfig::default().with_retry(RetryConfig::disabled())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::filter_relevant;

    #[test]
    fn test_sample_hits_are_relevant() {
        let hits = sample_hits("Graph Neural Networks", 5);
        assert_eq!(filter_relevant("Graph Neural Networks", hits.clone(), 0.5), hits);
        assert_eq!(hits[0].origin(), "http://arxiv.org/pdf/2401.00001v1");
    }

    #[test]
    fn test_config_disables_retry() {
        assert_eq!(test_config().retry.max_attempts, 1);
    }
}
