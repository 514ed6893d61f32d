// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential lifecycle: code exchange, expiry detection and refresh.
//!
//! `TokenManager` is the only writer of the stored credential. Every caller
//! that needs an access token goes through [`TokenManager::ensure_fresh`].

use crate::db::CredentialStore;
use crate::error::{AppError, Result};
use crate::models::Credential;
use crate::services::strava::ProviderClient;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Owns freshness of the single Strava credential.
pub struct TokenManager {
    provider: Arc<dyn ProviderClient>,
    store: Arc<dyn CredentialStore>,
    /// Serializes refreshes (and exchanges) within this process.
    refresh_lock: Arc<Mutex<()>>,
}

impl TokenManager {
    pub fn new(provider: Arc<dyn ProviderClient>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            provider,
            store,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Return a credential that is usable right now, refreshing it if needed.
    ///
    /// Concurrent callers racing the same expiry share one refresh: the first
    /// one through the lock refreshes and persists, the rest re-read the
    /// persisted record after the lock and find it fresh. The refresh itself
    /// runs as its own task and completes even if the caller is cancelled.
    pub async fn ensure_fresh(&self) -> Result<Credential> {
        let current = self.load().await?;
        if !current.needs_refresh(now()) {
            return Ok(current);
        }

        let guard = self.refresh_lock.clone().lock_owned().await;

        // Another task may have refreshed while we were waiting.
        let current = self.load().await?;
        if !current.needs_refresh(now()) {
            tracing::debug!("Credential already refreshed by a concurrent request");
            return Ok(current);
        }

        // Strava rotates the refresh token, so once the request is sent its
        // result must be stored even if this caller is dropped.
        let provider = self.provider.clone();
        let store = self.store.clone();
        let refresh = tokio::spawn(async move {
            let _guard = guard;
            tracing::info!(expires_at = current.expires_at, "Access token expired, refreshing");

            let refreshed = provider
                .refresh_token(&current.refresh_token)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, status = ?e.status(), "Strava token refresh failed");
                    AppError::RefreshFailed(e)
                })?;

            store.save(&refreshed).await?;

            tracing::info!(expires_at = refreshed.expires_at, "Token refreshed and stored");
            Ok::<_, AppError>(refreshed)
        });

        refresh
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token refresh task failed: {}", e)))?
    }

    /// One-time authorization code exchange; persists and returns the credential.
    pub async fn exchange(&self, code: &str) -> Result<Credential> {
        let _guard = self.refresh_lock.lock().await;

        let credential = self.provider.exchange_code(code).await.map_err(|e| {
            tracing::error!(error = %e, "Strava token exchange failed");
            AppError::ExchangeFailed(e)
        })?;

        self.store.save(&credential).await?;

        tracing::info!(
            expires_at = credential.expires_at,
            "Authorization code exchanged, credential stored"
        );
        Ok(credential)
    }

    async fn load(&self) -> Result<Credential> {
        self.store.load().await?.ok_or(AppError::NoCredential)
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
