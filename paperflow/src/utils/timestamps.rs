//! Timestamp helpers and time-derived artifact identifiers.

use chrono::{Local, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Last issued artifact instant, in microseconds since the epoch.
static LAST_ARTIFACT_MICROS: AtomicI64 = AtomicI64::new(0);

/// Returns the current UTC time as an ISO 8601 formatted string.
///
/// Format: `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`
///
/// # Examples
///
/// ```
/// use paperflow::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Returns the current local time in the human-readable artifact format.
#[must_use]
pub fn display_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Issues a new artifact identifier derived from the current time.
///
/// Identifiers look like `20250115_120000_123456` and sort lexicographically
/// in generation order. Two calls never return the same value within a
/// process, even when they land on the same microsecond.
#[must_use]
pub fn next_artifact_id() -> String {
    let now = Utc::now().timestamp_micros();
    let mut last = LAST_ARTIFACT_MICROS.load(Ordering::SeqCst);
    let issued = loop {
        let candidate = now.max(last + 1);
        match LAST_ARTIFACT_MICROS.compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => break candidate,
            Err(actual) => last = actual,
        }
    };
    format_artifact_id(issued)
}

fn format_artifact_id(micros: i64) -> String {
    Utc.timestamp_micros(micros)
        .single()
        .unwrap_or_else(Utc::now)
        .format("%Y%m%d_%H%M%S_%6f")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_artifact_ids_are_unique_and_sorted() {
        let ids: Vec<String> = (0..200).map(|_| next_artifact_id()).collect();

        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(sorted, ids);
    }

    #[test]
    fn test_artifact_id_shape() {
        let id = format_artifact_id(1_736_942_400_000_042);
        assert_eq!(id, "20250115_120000_000042");
    }

    #[test]
    fn test_display_timestamp_shape() {
        let ts = display_timestamp();
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
    }
}
