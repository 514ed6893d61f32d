// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar feed route.

use crate::error::Result;
use crate::AppState;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;

pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";
pub const CALENDAR_DISPOSITION: &str = "attachment; filename=\"strava.ics\"";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/calendar", get(calendar))
        .route("/calendar.ics", get(calendar))
}

/// Render the mirrored activities as an iCalendar document.
async fn calendar(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let body = state.feed.generate(chrono::Utc::now()).await?;

    Ok((
        [
            (header::CONTENT_TYPE, CALENDAR_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, CALENDAR_DISPOSITION),
        ],
        body,
    ))
}
