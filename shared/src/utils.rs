//! # Shared Utility Functions
//!
//! Formatting helpers used by the client core for logs and UI snapshots.
//!
//! ## Usage
//!
//! ```rust
//! use shared::utils::truncate_preview;
//!
//! assert_eq!(truncate_preview("hello world", 5), "hello...");
//! assert_eq!(truncate_preview("hi", 5), "hi");
//! ```

/// Truncate `text` to at most `max_chars` characters, appending `...` when cut.
///
/// Counts characters, not bytes, so multi-byte text (Korean messages from
/// the backend) is never split inside a code point.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Format an ISO-8601 timestamp with second precision and a `Z` suffix,
/// the shape the backend expects for `last_read_at`.
pub fn iso_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_preview() {
        assert_eq!(truncate_preview("abcdef", 3), "abc...");
        assert_eq!(truncate_preview("abc", 3), "abc");
        assert_eq!(truncate_preview("", 3), "");
    }

    #[test]
    fn test_truncate_preview_multibyte() {
        assert_eq!(truncate_preview("친구 요청이 도착했어요", 2), "친구...");
    }

    #[test]
    fn test_iso_timestamp() {
        let at = chrono::Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(iso_timestamp(at), "2026-03-01T09:30:00Z");
    }
}
