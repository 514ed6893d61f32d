// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::time::Duration;
use strava2cal::error::{AppError, ProviderError, StorageError};

mod common;
use common::body_json;

fn upstream() -> ProviderError {
    ProviderError::Status {
        status: 500,
        body: "boom".to_string(),
    }
}

#[test]
fn test_status_mapping() {
    let cases = [
        (AppError::NoCredential, StatusCode::UNAUTHORIZED),
        (AppError::ExchangeFailed(upstream()), StatusCode::BAD_GATEWAY),
        (AppError::RefreshFailed(upstream()), StatusCode::BAD_GATEWAY),
        (
            AppError::FetchActivityFailed {
                id: 1,
                source: upstream(),
            },
            StatusCode::BAD_GATEWAY,
        ),
        (AppError::FetchAllFailed(upstream()), StatusCode::BAD_GATEWAY),
        (AppError::SubscriptionFailed(upstream()), StatusCode::BAD_GATEWAY),
        (AppError::VerificationRejected, StatusCode::FORBIDDEN),
        (
            AppError::StorageFailed(StorageError::Backend("down".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        (
            AppError::Timeout(Duration::from_secs(120)),
            StatusCode::GATEWAY_TIMEOUT,
        ),
        (AppError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
        (AppError::BadRequest("x".to_string()), StatusCode::BAD_REQUEST),
        (
            AppError::Internal(anyhow::anyhow!("oops")),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (error, expected) in cases {
        let label = error.to_string();
        assert_eq!(error.into_response().status(), expected, "{}", label);
    }
}

#[test]
fn test_is_retryable() {
    assert!(AppError::FetchAllFailed(upstream()).is_retryable());
    assert!(AppError::FetchActivityFailed {
        id: 1,
        source: ProviderError::RateLimited
    }
    .is_retryable());
    assert!(AppError::Timeout(Duration::from_secs(1)).is_retryable());
    assert!(AppError::StorageFailed(StorageError::Backend("x".to_string())).is_retryable());

    assert!(!AppError::NoCredential.is_retryable());
    assert!(!AppError::RefreshFailed(ProviderError::Unauthorized).is_retryable());
    assert!(!AppError::ExchangeFailed(upstream()).is_retryable());
    assert!(!AppError::VerificationRejected.is_retryable());
}

#[tokio::test]
async fn test_error_body_shape() {
    let response = AppError::FetchActivityFailed {
        id: 42,
        source: ProviderError::RateLimited,
    }
    .into_response();

    let json = body_json(response).await;
    assert_eq!(json["error"], "fetch_activity_failed");
    assert!(json["details"].as_str().unwrap().contains("rate limit"));
}

#[tokio::test]
async fn test_storage_error_details_hidden() {
    let response =
        AppError::StorageFailed(StorageError::Backend("secret path".to_string())).into_response();

    let json = body_json(response).await;
    assert_eq!(json["error"], "storage_error");
    assert!(json.get("details").is_none());
}

#[test]
fn test_provider_error_status() {
    assert_eq!(ProviderError::Unauthorized.status(), Some(401));
    assert_eq!(ProviderError::RateLimited.status(), Some(429));
    assert_eq!(upstream().status(), Some(500));
    assert_eq!(ProviderError::Transport("reset".to_string()).status(), None);
}
