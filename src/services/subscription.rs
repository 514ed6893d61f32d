// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava push subscription management.

use crate::db::CredentialStore;
use crate::error::{AppError, Result};
use crate::services::strava::ProviderClient;
use serde::Serialize;
use std::sync::Arc;

/// Stored vs. upstream view of the webhook subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionStatus {
    pub stored: Option<u64>,
    pub upstream: Vec<u64>,
}

/// Registers and removes the webhook subscription that feeds the mirror.
pub struct SubscriptionService {
    provider: Arc<dyn ProviderClient>,
    store: Arc<dyn CredentialStore>,
    callback_url: String,
    verify_token: String,
}

impl SubscriptionService {
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        store: Arc<dyn CredentialStore>,
        callback_url: String,
        verify_token: String,
    ) -> Self {
        Self {
            provider,
            store,
            callback_url,
            verify_token,
        }
    }

    /// Register the callback with Strava and remember the subscription ID.
    ///
    /// Strava calls back into the webhook handshake while this request is in
    /// flight, so the verify handler must already be serving.
    pub async fn register(&self) -> Result<u64> {
        tracing::info!(callback_url = %self.callback_url, "Registering webhook subscription");

        let id = self
            .provider
            .create_subscription(&self.callback_url, &self.verify_token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Webhook subscription registration failed");
                AppError::SubscriptionFailed(e)
            })?;

        self.store.save_subscription_id(id).await?;

        tracing::info!(subscription_id = id, "Webhook subscription registered");
        Ok(id)
    }

    pub async fn status(&self) -> Result<SubscriptionStatus> {
        let stored = self.store.load_subscription_id().await?;
        let upstream = self
            .provider
            .list_subscriptions()
            .await
            .map_err(AppError::SubscriptionFailed)?;

        if let Some(id) = stored {
            if !upstream.contains(&id) {
                tracing::warn!(subscription_id = id, "Stored subscription unknown to Strava");
            }
        }

        Ok(SubscriptionStatus { stored, upstream })
    }

    /// Delete the stored subscription upstream, then forget it.
    pub async fn unregister(&self) -> Result<u64> {
        let id = self
            .store
            .load_subscription_id()
            .await?
            .ok_or_else(|| AppError::NotFound("no webhook subscription stored".to_string()))?;

        self.provider.delete_subscription(id).await.map_err(|e| {
            tracing::error!(subscription_id = id, error = %e, "Failed to delete subscription");
            AppError::SubscriptionFailed(e)
        })?;

        self.store.clear_subscription_id().await?;

        tracing::info!(subscription_id = id, "Webhook subscription deleted");
        Ok(id)
    }
}
