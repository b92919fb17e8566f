//! Human-readable formatting for image sizes and ages.

use chrono::{DateTime, Utc};
use chrono_humanize::Humanize;
use humansize::{BINARY, format_size as format_size_human};


/// Formats a byte size using binary units (KiB, MiB).
///
/// # Examples
///
/// ```
/// use libstevedore::format::format_size;
///
/// assert_eq!(format_size(1024 * 1024 * 5), "5 MiB");
/// assert_eq!(format_size(1024), "1 KiB");
/// ```
pub fn format_size(size_bytes: u64) -> String {
    format_size_human(size_bytes, BINARY)
}

/// Formats a timestamp relative to now, e.g. "a day ago".
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.humanize()
}
