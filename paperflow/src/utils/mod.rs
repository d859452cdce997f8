//! Utility functions for timestamps, artifact identifiers and text handling.

pub mod text;
pub mod timestamps;

pub use text::{to_latin1_lossy, truncate_chars, truncate_with_ellipsis};
pub use timestamps::{display_timestamp, iso_timestamp, next_artifact_id};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.ends_with("+00:00"));
    }
}
