// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Manual full resync trigger.

use crate::error::Result;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/sync", get(resync).post(resync))
}

#[derive(Debug, Serialize)]
pub struct ResyncResponse {
    pub status: &'static str,
    pub fetched: usize,
    pub replaced: bool,
}

async fn resync(State(state): State<Arc<AppState>>) -> Result<Json<ResyncResponse>> {
    let outcome = state.sync.resync_all(state.config.resync_timeout).await?;

    Ok(Json(ResyncResponse {
        status: if outcome.replaced { "ok" } else { "unchanged" },
        fetched: outcome.fetched,
        replaced: outcome.replaced,
    }))
}
