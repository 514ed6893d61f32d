// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! iCalendar feed rendering from the activity mirror.

use crate::db::ActivityStore;
use crate::error::Result;
use crate::models::Activity;
use crate::time_utils::{format_duration_secs, format_ical_utc};
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::sync::Arc;

const PRODID: &str = "-//Strava To Calendar//EN";
const UID_DOMAIN: &str = "strava2cal";
const ACTIVITY_URL_BASE: &str = "https://www.strava.com/activities";
const CRLF: &str = "\r\n";

/// Escape a TEXT value (RFC 5545 3.3.11).
///
/// Line breaks of any flavor become `\n`. Backslash goes first so the
/// escapes added afterwards are not doubled.
pub fn escape_text(value: &str) -> String {
    value
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

/// Stable per-activity UID, so calendar clients update events in place.
pub fn event_uid(activity_id: u64) -> String {
    format!("{}@{}", activity_id, UID_DOMAIN)
}

/// Canonical link back to the activity on Strava.
pub fn activity_url(activity_id: u64) -> String {
    format!("{}/{}", ACTIVITY_URL_BASE, activity_id)
}

/// Unescaped description lines for one activity.
fn description_lines(activity: &Activity) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Duration: {}",
            format_duration_secs(activity.elapsed_time_secs)
        ),
        format!(
            "Distance: {:.2}km | Elevation: {:.0}m",
            activity.distance / 1000.0,
            activity.elevation_gain
        ),
    ];

    if activity.average_speed > 0.0 {
        lines.push(format!(
            "Average Speed: {:.2}km/h",
            activity.average_speed * 3.6
        ));
    }
    if activity.average_watts > 0.0 {
        lines.push(format!("Average Power: {:.0}W", activity.average_watts));
    }
    if activity.average_cadence > 0.0 {
        lines.push(format!("Average Cadence: {:.0}rpm", activity.average_cadence));
    }

    lines.push(activity_url(activity.id));
    lines
}

/// Render `activities` as a complete VCALENDAR document.
///
/// Pure: the same input set and `now` always yield the same bytes,
/// regardless of the order the activities are passed in.
pub fn render(activities: &[Activity], now: DateTime<Utc>) -> String {
    let mut sorted: Vec<&Activity> = activities.iter().collect();
    sorted.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));

    let dtstamp = format_ical_utc(now);
    let mut out = String::new();

    push_line(&mut out, "BEGIN:VCALENDAR");
    push_line(&mut out, "VERSION:2.0");
    push_line(&mut out, &format!("PRODID:{}", PRODID));
    push_line(&mut out, "CALSCALE:GREGORIAN");
    push_line(&mut out, "METHOD:PUBLISH");

    for activity in sorted {
        let summary = format!("{} | {}", activity.activity_type, activity.name);
        let description = description_lines(activity).join("\n");

        push_line(&mut out, "BEGIN:VEVENT");
        push_line(&mut out, &format!("UID:{}", event_uid(activity.id)));
        push_line(&mut out, &format!("DTSTAMP:{}", dtstamp));
        push_line(&mut out, &format!("SUMMARY:{}", escape_text(&summary)));
        push_line(
            &mut out,
            &format!("DTSTART:{}", format_ical_utc(activity.start_time)),
        );
        push_line(
            &mut out,
            &format!("DTEND:{}", format_ical_utc(activity.end_time)),
        );
        push_line(
            &mut out,
            &format!("DESCRIPTION:{}", escape_text(&description)),
        );
        push_line(&mut out, "END:VEVENT");
    }

    push_line(&mut out, "END:VCALENDAR");
    out
}

fn push_line(out: &mut String, line: &str) {
    // Writing to a String cannot fail.
    let _ = write!(out, "{}{}", line, CRLF);
}

/// Loads the mirror and renders it.
pub struct FeedGenerator {
    activities: Arc<dyn ActivityStore>,
}

impl FeedGenerator {
    pub fn new(activities: Arc<dyn ActivityStore>) -> Self {
        Self { activities }
    }

    /// Render the current mirror. A store failure is an error, never an empty feed.
    pub async fn generate(&self, now: DateTime<Utc>) -> Result<String> {
        let activities = self.activities.list().await?;
        tracing::debug!(count = activities.len(), "Rendering calendar feed");
        Ok(render(&activities, now))
    }
}
