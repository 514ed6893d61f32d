// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook subscription management routes.

use crate::error::Result;
use crate::services::SubscriptionStatus;
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/subscriptions",
        get(status).post(register).delete(unregister),
    )
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub status: &'static str,
    pub id: u64,
}

async fn register(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SubscriptionResponse>)> {
    let id = state.subscriptions.register().await?;
    Ok((
        StatusCode::CREATED,
        Json(SubscriptionResponse {
            status: "subscribed",
            id,
        }),
    ))
}

async fn status(State(state): State<Arc<AppState>>) -> Result<Json<SubscriptionStatus>> {
    Ok(Json(state.subscriptions.status().await?))
}

async fn unregister(State(state): State<Arc<AppState>>) -> Result<Json<SubscriptionResponse>> {
    let id = state.subscriptions.unregister().await?;
    Ok(Json(SubscriptionResponse {
        status: "unsubscribed",
        id,
    }))
}
