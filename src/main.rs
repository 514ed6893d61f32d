// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! strava2cal API server
//!
//! Receives Strava webhooks, keeps the activity mirror in sync and serves
//! it as a calendar feed.

use std::sync::Arc;
use strava2cal::{config::Config, db, services::StravaClient, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        callback_url = %config.webhook_callback_url(),
        "Starting strava2cal"
    );

    let stores = db::open_stores(&config).await?;

    let provider = Arc::new(StravaClient::with_base_url(
        &config.strava_base_url,
        config.strava_client_id.clone(),
        config.strava_client_secret.clone(),
    ));

    let state = Arc::new(AppState::new(config.clone(), provider, stores));

    // Build router
    let app = strava2cal::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strava2cal=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .try_init()?;
    Ok(())
}
