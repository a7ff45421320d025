//! Relative age labels for todo lists.

use chrono::{DateTime, Utc};

/// Formats how long ago `created_at` was, relative to `now`
///
/// Under a minute reads `"just now"`, under an hour `"{n} min ago"`, under a
/// day `"{n} h ago"`. Anything older shows the calendar date, e.g. `"Jan 05"`.
/// Timestamps in the future are treated as "just now".
#[must_use]
pub fn relative_age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const MINUTE: i64 = 60_000;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;

    let diff = (now - created_at).num_milliseconds();
    match diff {
        d if d < MINUTE => "just now".to_string(),
        d if d < HOUR => format!("{} min ago", d / MINUTE),
        d if d < DAY => format!("{} h ago", d / HOUR),
        _ => created_at.format("%b %d").to_string(),
    }
}
