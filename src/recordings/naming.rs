//! # Recording File Names
//!
//! Every recording on disk is named after the moment its upload was accepted:
//!
//! ```text
//! recording_2025-01-15T10-30-45-123Z.webm
//! recording_2025-01-15T10-30-45-123Z_1.webm   (second upload in the same millisecond)
//! ```
//!
//! The timestamp is UTC at millisecond resolution with the `:` and `.`
//! separators replaced by `-`, so the name is safe on every common filesystem.
//! When two uploads resolve to the same millisecond the store asks for the
//! next `attempt`, which appends a numeric disambiguator.

use chrono::{DateTime, Utc};

/// Prefix shared by every generated recording name.
pub const RECORDING_PREFIX: &str = "recording_";

/// Extension of every stored recording (the browser produces WebM/Opus).
pub const RECORDING_EXTENSION: &str = ".webm";

/// Filesystem-safe rendering of an instant, e.g. `2025-01-15T10-30-45-123Z`.
pub fn filesystem_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

/// Build the file name for an upload accepted at `at`.
///
/// `attempt` 0 is the plain name; every later attempt appends `_<attempt>`.
/// The caller walks the attempts until it finds a name that is not taken.
pub fn recording_file_name(at: DateTime<Utc>, attempt: u32) -> String {
    let timestamp = filesystem_timestamp(at);
    if attempt == 0 {
        format!("{}{}{}", RECORDING_PREFIX, timestamp, RECORDING_EXTENSION)
    } else {
        format!("{}{}_{}{}", RECORDING_PREFIX, timestamp, attempt, RECORDING_EXTENSION)
    }
}

/// Whether a directory entry should be reported as a recording.
///
/// Hidden files (temporary uploads start with a dot) never count.
pub fn is_recording_file_name(name: &str) -> bool {
    !name.starts_with('.') && name.ends_with(RECORDING_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 45).unwrap()
            + chrono::Duration::milliseconds(123)
    }

    #[test]
    fn test_first_attempt_has_no_suffix() {
        assert_eq!(
            recording_file_name(sample_instant(), 0),
            "recording_2025-01-15T10-30-45-123Z.webm"
        );
    }

    #[test]
    fn test_later_attempts_are_disambiguated() {
        let at = sample_instant();
        assert_eq!(recording_file_name(at, 1), "recording_2025-01-15T10-30-45-123Z_1.webm");
        assert_ne!(recording_file_name(at, 1), recording_file_name(at, 2));
    }

    #[test]
    fn test_names_are_filesystem_safe() {
        let name = recording_file_name(sample_instant(), 3);
        assert!(!name.contains(':'));
        assert!(!name.contains('/'));
        assert_eq!(name.matches('.').count(), 1);
    }

    #[test]
    fn test_distinct_milliseconds_give_distinct_names() {
        let at = sample_instant();
        let later = at + chrono::Duration::milliseconds(1);
        assert_ne!(recording_file_name(at, 0), recording_file_name(later, 0));
    }

    #[test]
    fn test_recording_file_filter() {
        assert!(is_recording_file_name("recording_2025-01-15T10-30-45-123Z.webm"));
        assert!(is_recording_file_name("imported.webm"));
        assert!(!is_recording_file_name(".upload-1234.part"));
        assert!(!is_recording_file_name(".hidden.webm"));
        assert!(!is_recording_file_name("notes.txt"));
    }
}
