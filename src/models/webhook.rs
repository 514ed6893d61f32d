// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava push notification payload.

use serde::{Deserialize, Serialize};

/// What happened to the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aspect {
    Create,
    Update,
    Delete,
    /// Anything Strava may add later; never acted upon.
    #[serde(other)]
    Other,
}

/// Kind of object the event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Activity,
    Athlete,
    #[serde(other)]
    Other,
}

/// A single webhook delivery. Applied, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "aspect_type")]
    pub aspect: Aspect,
    pub object_type: ObjectType,
    pub object_id: u64,
    pub owner_id: u64,
    #[serde(default)]
    pub subscription_id: Option<u64>,
    #[serde(default)]
    pub event_time: Option<i64>,
    /// For athlete events, contains {"authorized": "false"} on deauthorization
    #[serde(default)]
    pub updates: Option<serde_json::Map<String, serde_json::Value>>,
}
