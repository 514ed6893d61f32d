// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time parsing and formatting.

use chrono::{DateTime, Utc};

/// Format a UTC timestamp in iCalendar basic form (`20240101T070000Z`).
pub fn format_ical_utc(date: DateTime<Utc>) -> String {
    date.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Parse an RFC3339 timestamp, falling back to the unix epoch when absent or invalid.
pub fn parse_rfc3339_or_epoch(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Render a duration the way Strava users read it: `1h2m5s`, `25m0s`, `45s`.
pub fn format_duration_secs(total: i64) -> String {
    let total = total.max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
