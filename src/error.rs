// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;

/// Failure of a single outbound call to Strava.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("Strava rejected the access token (401)")]
    Unauthorized,

    #[error("Strava rate limit hit (429)")]
    RateLimited,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Decode(String),
}

impl ProviderError {
    /// HTTP status reported by Strava, if the call got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Unauthorized => Some(401),
            ProviderError::RateLimited => Some(429),
            ProviderError::Status { status, .. } => Some(*status),
            ProviderError::Transport(_) | ProviderError::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Decode(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

/// Failure of a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt state: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No Strava credential stored; authorization required")]
    NoCredential,

    #[error("Authorization code exchange failed: {0}")]
    ExchangeFailed(#[source] ProviderError),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(#[source] ProviderError),

    #[error("Failed to fetch activity {id}: {source}")]
    FetchActivityFailed {
        id: u64,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to fetch activities: {0}")]
    FetchAllFailed(#[source] ProviderError),

    #[error("Subscription request failed: {0}")]
    SubscriptionFailed(#[source] ProviderError),

    #[error("Webhook verification rejected")]
    VerificationRejected,

    #[error("Storage error: {0}")]
    StorageFailed(#[from] StorageError),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether repeating the same operation later may succeed without user action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::FetchActivityFailed { .. }
                | AppError::FetchAllFailed(_)
                | AppError::StorageFailed(_)
                | AppError::Timeout(_)
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NoCredential => (StatusCode::UNAUTHORIZED, "no_credential", None),
            AppError::ExchangeFailed(e) => {
                (StatusCode::BAD_GATEWAY, "exchange_failed", Some(e.to_string()))
            }
            AppError::RefreshFailed(e) => {
                (StatusCode::BAD_GATEWAY, "refresh_failed", Some(e.to_string()))
            }
            AppError::FetchActivityFailed { source, .. } => (
                StatusCode::BAD_GATEWAY,
                "fetch_activity_failed",
                Some(source.to_string()),
            ),
            AppError::FetchAllFailed(e) => {
                (StatusCode::BAD_GATEWAY, "fetch_all_failed", Some(e.to_string()))
            }
            AppError::SubscriptionFailed(e) => {
                (StatusCode::BAD_GATEWAY, "subscription_failed", Some(e.to_string()))
            }
            AppError::VerificationRejected => {
                (StatusCode::FORBIDDEN, "verification_rejected", None)
            }
            AppError::StorageFailed(e) => {
                tracing::error!(error = %e, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AppError::Timeout(after) => (
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                Some(format!("gave up after {}s", after.as_secs())),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
