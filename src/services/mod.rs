// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod feed;
pub mod strava;
pub mod subscription;
pub mod sync;
pub mod tokens;

pub use feed::FeedGenerator;
pub use strava::{ProviderClient, StravaClient};
pub use subscription::{SubscriptionService, SubscriptionStatus};
pub use sync::{EventOutcome, ResyncOutcome, SyncEngine};
pub use tokens::TokenManager;
