// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Mirrored Strava activity model for storage and the calendar feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical activity record, keyed by the Strava activity ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Strava activity ID (also used as document ID)
    pub id: u64,
    /// Activity name/title
    pub name: String,
    /// Distance in meters
    pub distance: f64,
    /// Total elevation gain in meters
    pub elevation_gain: f64,
    pub elapsed_time_secs: i64,
    /// Average speed in m/s
    pub average_speed: f64,
    pub average_watts: f64,
    pub average_cadence: f64,
    pub timezone: String,
    /// Human-readable sport label ("Trail Run", "E-Bike Ride", ...)
    pub activity_type: String,
    pub start_time: DateTime<Utc>,
    /// Always `start_time + elapsed_time_secs`
    pub end_time: DateTime<Utc>,
}
