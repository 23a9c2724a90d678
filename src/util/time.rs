//! Timestamp formatting shared by collectors.

use chrono::{DateTime, SecondsFormat};

/// Formats seconds since epoch as ISO-8601 UTC (`2023-11-14T22:13:20Z`).
///
/// Returns `None` for timestamps chrono cannot represent.
pub fn epoch_to_iso(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_to_iso() {
        assert_eq!(
            epoch_to_iso(1_700_000_000).as_deref(),
            Some("2023-11-14T22:13:20Z")
        );
        assert_eq!(epoch_to_iso(0).as_deref(), Some("1970-01-01T00:00:00Z"));
        assert_eq!(epoch_to_iso(i64::MAX), None);
    }
}
