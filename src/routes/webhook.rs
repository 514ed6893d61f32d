// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook routes for Strava events.

use crate::error::{AppError, Result};
use crate::models::WebhookEvent;
use crate::services::EventOutcome;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", get(verify).post(handle_event))
}

/// Strava webhook verification query params.
#[derive(Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode", default)]
    mode: Option<String>,
    #[serde(rename = "hub.challenge", alias = "challenge", default)]
    challenge: Option<String>,
    #[serde(rename = "hub.verify_token", alias = "verify_token", default)]
    verify_token: Option<String>,
}

/// Verification response.
#[derive(Serialize)]
struct VerifyResponse {
    #[serde(rename = "hub.challenge")]
    challenge: String,
}

/// Verify webhook subscription (GET).
async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<VerifyResponse>> {
    let (Some(verify_token), Some(challenge)) = (params.verify_token, params.challenge) else {
        return Err(AppError::BadRequest(
            "verify_token and challenge are required".to_string(),
        ));
    };

    if let Some(mode) = params.mode.as_deref().filter(|m| *m != "subscribe") {
        tracing::warn!(mode = %mode, "Webhook verification with unexpected mode");
        return Err(AppError::VerificationRejected);
    }

    match state.sync.verify_subscription(&verify_token, &challenge) {
        Ok(challenge) => {
            tracing::info!("Webhook subscription verified");
            Ok(Json(VerifyResponse { challenge }))
        }
        Err(e) => {
            tracing::warn!("Webhook verification failed: invalid token");
            Err(e)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub status: &'static str,
    pub outcome: EventOutcome,
}

/// Handle incoming webhook events (POST).
///
/// Failures return a non-2xx status so Strava redelivers the event.
async fn handle_event(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<EventResponse>> {
    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse webhook event");
        AppError::BadRequest(format!("malformed webhook event: {}", e))
    })?;

    tracing::info!(
        object_type = ?event.object_type,
        object_id = event.object_id,
        aspect = ?event.aspect,
        owner_id = event.owner_id,
        subscription_id = ?event.subscription_id,
        "Webhook event received"
    );

    let outcome = state.sync.apply_event(&event).await?;

    Ok(Json(EventResponse {
        status: "ok",
        outcome,
    }))
}
