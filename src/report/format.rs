//! Display formatting for report cells.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// `dd-mm-YYYY HH:MM:SS` after shifting by `offset_hours`.
pub fn format_timestamp(t: DateTime<Utc>, offset_hours: i64) -> String {
    (t + chrono::Duration::hours(offset_hours))
        .format("%d-%m-%Y %H:%M:%S")
        .to_string()
}

/// `HH:MM:SS`; hours keep counting past a day.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
