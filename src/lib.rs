// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! strava2cal: mirror Strava activities into a subscribable calendar feed.
//!
//! Strava webhooks keep a local activity mirror current; the mirror is
//! rendered on demand as an iCalendar document.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Stores;
use services::{FeedGenerator, ProviderClient, SubscriptionService, SyncEngine, TokenManager};
use std::sync::Arc;

/// Shared application state.
///
/// Built once at startup; every component receives its collaborators here
/// instead of reaching for globals.
pub struct AppState {
    pub config: Config,
    pub tokens: Arc<TokenManager>,
    pub sync: SyncEngine,
    pub feed: FeedGenerator,
    pub subscriptions: SubscriptionService,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn ProviderClient>, stores: Stores) -> Self {
        let tokens = Arc::new(TokenManager::new(
            provider.clone(),
            stores.credentials.clone(),
        ));
        let sync = SyncEngine::new(
            tokens.clone(),
            provider.clone(),
            stores.activities.clone(),
            config.webhook_verify_token.clone(),
        );
        let feed = FeedGenerator::new(stores.activities.clone());
        let subscriptions = SubscriptionService::new(
            provider,
            stores.credentials.clone(),
            config.webhook_callback_url(),
            config.webhook_verify_token.clone(),
        );

        Self {
            config,
            tokens,
            sync,
            feed,
            subscriptions,
        }
    }
}
