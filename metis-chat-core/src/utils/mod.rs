//! Utility functions and helpers

use chrono::Utc;
use uuid::Uuid;

/// Prefix marking ids that were generated locally and are unknown to the server
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Generate a fresh local-only id (`temp-<uuid>`)
pub fn temp_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4().simple())
}

/// Whether an id was generated locally by [`temp_id`]
pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Current time as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

const ELLIPSIS: &str = "...";

/// Truncate a string to at most `max_len` bytes on a char boundary.
///
/// An ellipsis marks the cut when there is room for it.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let (budget, suffix) = if max_len >= ELLIPSIS.len() {
        (max_len - ELLIPSIS.len(), ELLIPSIS)
    } else {
        (max_len, "")
    };
    let mut end = budget;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &s[..end], suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_id_is_recognizable() {
        let id = temp_id();
        assert!(id.starts_with("temp-"));
        assert!(is_temporary_id(&id));
        assert!(!is_temporary_id("6f1c2a"));
    }

    #[test]
    fn test_temp_ids_are_unique() {
        assert_ne!(temp_id(), temp_id());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("test", 3), "...");
    }

    #[test]
    fn test_truncate_never_exceeds_max_len() {
        assert_eq!(truncate("test", 2), "te");
        assert_eq!(truncate("test", 0), "");
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("héllo wörld", 6), "hé...");
        for max_len in 0..12 {
            assert!(truncate("héllo wörld", max_len).len() <= max_len);
        }
    }
}
