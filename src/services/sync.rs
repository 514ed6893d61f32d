// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity mirror synchronization.
//!
//! Handles:
//! 1. Webhook subscription handshake (pure token check)
//! 2. Webhook change events (create/update fetch + upsert, delete remove)
//! 3. Full resync sweeps (fetch everything, then swap atomically)
//!
//! Deliveries may arrive duplicated or out of order. Create/update always
//! fetches the current upstream state, so replays converge on the same
//! record, and delete is idempotent.

use crate::db::ActivityStore;
use crate::error::{AppError, Result};
use crate::models::{Aspect, ObjectType, WebhookEvent};
use crate::services::strava::ProviderClient;
use crate::services::tokens::TokenManager;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tokio::sync::{Mutex, RwLock};

/// Per-activity locks serializing writes to the same ID.
pub type ActivityLocks = Arc<DashMap<u64, Arc<Mutex<()>>>>;

/// What applying a webhook event did to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EventOutcome {
    /// Not an activity event (or an aspect we don't act on).
    Ignored,
    Upserted { activity_id: u64 },
    Removed { activity_id: u64 },
}

/// Result of a full resync sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResyncOutcome {
    /// Activities returned by Strava.
    pub fetched: usize,
    /// Whether the mirror was swapped (false when Strava returned nothing).
    pub replaced: bool,
}

/// Check a subscription handshake and return the challenge to echo.
pub fn verify_challenge(
    expected_token: &str,
    provided_token: &str,
    challenge: &str,
) -> Result<String> {
    let matches: bool = expected_token
        .as_bytes()
        .ct_eq(provided_token.as_bytes())
        .into();
    if matches {
        Ok(challenge.to_string())
    } else {
        Err(AppError::VerificationRejected)
    }
}

/// Applies webhook events and resync sweeps to the activity mirror.
///
/// Single-ID writes (`upsert`/`remove`) hold the mirror gate shared plus a
/// per-ID lock; `replace_all` holds the gate exclusively for the swap.
pub struct SyncEngine {
    tokens: Arc<TokenManager>,
    provider: Arc<dyn ProviderClient>,
    activities: Arc<dyn ActivityStore>,
    verify_token: String,
    mirror_gate: RwLock<()>,
    activity_locks: ActivityLocks,
}

impl SyncEngine {
    pub fn new(
        tokens: Arc<TokenManager>,
        provider: Arc<dyn ProviderClient>,
        activities: Arc<dyn ActivityStore>,
        verify_token: String,
    ) -> Self {
        Self {
            tokens,
            provider,
            activities,
            verify_token,
            mirror_gate: RwLock::new(()),
            activity_locks: Arc::new(DashMap::new()),
        }
    }

    /// Answer the subscription handshake.
    pub fn verify_subscription(&self, verify_token: &str, challenge: &str) -> Result<String> {
        verify_challenge(&self.verify_token, verify_token, challenge)
    }

    /// Apply one webhook change notification.
    pub async fn apply_event(&self, event: &WebhookEvent) -> Result<EventOutcome> {
        if event.object_type != ObjectType::Activity {
            tracing::debug!(
                object_type = ?event.object_type,
                aspect = ?event.aspect,
                owner_id = event.owner_id,
                "Ignoring non-activity event"
            );
            return Ok(EventOutcome::Ignored);
        }

        let activity_id = event.object_id;
        match event.aspect {
            Aspect::Delete => {
                self.remove(activity_id).await?;
                tracing::info!(activity_id, "Activity removed from mirror");
                Ok(EventOutcome::Removed { activity_id })
            }
            Aspect::Create | Aspect::Update => {
                let credential = self.tokens.ensure_fresh().await?;

                // Fetch fully before touching the store.
                let activity = self
                    .provider
                    .get_activity(&credential.access_token, activity_id)
                    .await
                    .map_err(|source| {
                        tracing::warn!(
                            activity_id,
                            status = ?source.status(),
                            error = %source,
                            "Failed to fetch activity"
                        );
                        AppError::FetchActivityFailed {
                            id: activity_id,
                            source,
                        }
                    })?;

                let _gate = self.mirror_gate.read().await;
                let lock = self.activity_lock(activity_id);
                let written = {
                    let _guard = lock.lock().await;
                    self.activities.upsert(&activity).await
                };
                self.release_activity_lock(activity_id, lock);
                written?;

                tracing::info!(
                    activity_id,
                    aspect = ?event.aspect,
                    activity_type = %activity.activity_type,
                    "Activity upserted into mirror"
                );
                Ok(EventOutcome::Upserted { activity_id })
            }
            Aspect::Other => {
                tracing::debug!(activity_id, "Ignoring activity event with unknown aspect");
                Ok(EventOutcome::Ignored)
            }
        }
    }

    /// Re-fetch every activity and replace the mirror in one swap.
    ///
    /// With a `deadline`, the refresh and fetch must finish in time or the
    /// sweep fails with `Timeout`. The mirror is untouched on any failure,
    /// and also when Strava returns an empty list.
    pub async fn resync_all(&self, deadline: Option<Duration>) -> Result<ResyncOutcome> {
        tracing::info!("Starting full activity resync");

        let fetch = async {
            let credential = self.tokens.ensure_fresh().await?;
            self.provider
                .list_activities(&credential.access_token)
                .await
                .map_err(|e| {
                    tracing::warn!(status = ?e.status(), error = %e, "Failed to fetch activity list");
                    AppError::FetchAllFailed(e)
                })
        };

        let activities = match deadline {
            Some(limit) => tokio::time::timeout(limit, fetch).await.map_err(|_| {
                tracing::warn!(timeout_secs = limit.as_secs(), "Resync timed out");
                AppError::Timeout(limit)
            })??,
            None => fetch.await?,
        };

        let fetched = activities.len();
        if fetched == 0 {
            tracing::warn!("Resync returned no activities, keeping current mirror");
            return Ok(ResyncOutcome {
                fetched,
                replaced: false,
            });
        }

        {
            let _gate = self.mirror_gate.write().await;
            self.activities.replace_all(&activities).await?;
        }

        tracing::info!(count = fetched, "Activity mirror replaced");
        Ok(ResyncOutcome {
            fetched,
            replaced: true,
        })
    }

    async fn remove(&self, activity_id: u64) -> Result<()> {
        let _gate = self.mirror_gate.read().await;
        let lock = self.activity_lock(activity_id);
        let removed = {
            let _guard = lock.lock().await;
            self.activities.remove(activity_id).await
        };
        self.release_activity_lock(activity_id, lock);
        removed?;
        Ok(())
    }

    fn activity_lock(&self, activity_id: u64) -> Arc<Mutex<()>> {
        self.activity_locks
            .entry(activity_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the map entry once no other writer holds or waits on it.
    ///
    /// Must be called after the guard is released; waiters hold their own
    /// clone, which keeps the count above two.
    fn release_activity_lock(&self, activity_id: u64, lock: Arc<Mutex<()>>) {
        self.activity_locks
            .remove_if(&activity_id, |_, entry| Arc::strong_count(entry) == 2);
        drop(lock);
    }
}
