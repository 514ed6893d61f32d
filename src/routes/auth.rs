// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth authorization routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::services::strava::authorize_url;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a signed `state` stays valid.
pub const STATE_MAX_AGE_SECS: i64 = 600;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/start", get(auth_start))
        .route("/auth", get(auth_callback))
}

fn mac_for(key: &[u8]) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))
}

/// Build the signed OAuth `state`: `base64url("{timestamp_hex}|{signature_hex}")`.
pub fn sign_state(key: &[u8], issued_at: i64) -> Result<String> {
    let payload = format!("{:x}", issued_at);

    let mut mac = mac_for(key)?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Check signature and age of a `state` produced by [`sign_state`].
pub fn verify_state(state: &str, key: &[u8], now: i64) -> bool {
    let Some((timestamp_hex, signature_hex)) = URL_SAFE_NO_PAD
        .decode(state)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|s| {
            s.split_once('|')
                .map(|(t, sig)| (t.to_string(), sig.to_string()))
        })
    else {
        return false;
    };

    let Ok(signature) = hex::decode(&signature_hex) else {
        return false;
    };
    let Ok(mut mac) = mac_for(key) else {
        return false;
    };
    mac.update(timestamp_hex.as_bytes());
    // verify_slice compares in constant time
    if mac.verify_slice(&signature).is_err() {
        tracing::warn!("OAuth state signature mismatch");
        return false;
    }

    match i64::from_str_radix(&timestamp_hex, 16) {
        Ok(issued_at) => {
            let age = now - issued_at;
            (0..=STATE_MAX_AGE_SECS).contains(&age)
        }
        Err(_) => false,
    }
}

/// Start OAuth flow - redirect to Strava authorization.
async fn auth_start(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let oauth_state = sign_state(&state.config.oauth_state_key, chrono::Utc::now().timestamp())?;

    let url = authorize_url(
        &state.config.strava_base_url,
        &state.config.strava_client_id,
        &state.config.oauth_redirect_url(),
        &oauth_state,
    );

    tracing::info!(
        client_id = %state.config.strava_client_id,
        "Starting OAuth flow, redirecting to Strava"
    );

    Ok(Redirect::temporary(&url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthorizedResponse {
    pub status: &'static str,
    pub expires_at: i64,
}

/// OAuth callback - exchange the code and store the credential.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<AuthorizedResponse>> {
    // Check for OAuth errors
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Strava");
        return Err(AppError::BadRequest(format!("authorization denied: {}", error)));
    }

    let now = chrono::Utc::now().timestamp();
    let state_ok = params
        .state
        .as_deref()
        .is_some_and(|s| verify_state(s, &state.config.oauth_state_key, now));
    if !state_ok {
        tracing::warn!("Invalid, expired or missing OAuth state parameter");
        return Err(AppError::BadRequest("invalid state parameter".to_string()));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing code parameter".to_string()))?;

    tracing::info!("Exchanging authorization code for tokens");
    let credential = state.tokens.exchange(&code).await?;

    Ok(Json(AuthorizedResponse {
        status: "authorized",
        expires_at: credential.expires_at,
    }))
}
