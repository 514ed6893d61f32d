// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage failures surface as errors and leave stored state as it was.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use std::sync::atomic::Ordering;
use strava2cal::db::{ActivityStore, CredentialStore, MemoryStore};
use strava2cal::error::AppError;
use strava2cal::models::{Aspect, ObjectType, WebhookEvent};
use tower::ServiceExt;

mod common;
use common::{activity, body_json, create_failing_test_app, expired_credential, fresh_credential};

fn create_request(id: u64) -> Request<Body> {
    let event = json!({
        "aspect_type": "create",
        "event_time": 1704092400,
        "object_id": id,
        "object_type": "activity",
        "owner_id": 134815,
        "subscription_id": 120475,
        "updates": {}
    });
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .body(Body::from(event.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_webhook_upsert_failure_is_storage_error() {
    let (app, failing) = create_failing_test_app(MemoryStore::with_credential(fresh_credential()));
    app.provider.put_activity(activity(7, "Lost write"));
    failing.fail_upsert.store(true, Ordering::SeqCst);

    let response = app.router.clone().oneshot(create_request(7)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "storage_error");
    assert!(app.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_failure_keeps_record() {
    let (app, failing) = create_failing_test_app(MemoryStore::with_credential(fresh_credential()));
    app.store.upsert(&activity(7, "Still here")).await.unwrap();
    failing.fail_remove.store(true, Ordering::SeqCst);

    let event = WebhookEvent {
        aspect: Aspect::Delete,
        object_type: ObjectType::Activity,
        object_id: 7,
        owner_id: 134815,
        subscription_id: None,
        event_time: None,
        updates: None,
    };
    let result = app.state.sync.apply_event(&event).await;

    assert!(matches!(result, Err(AppError::StorageFailed(_))));
    assert_eq!(app.store.list().await.unwrap(), vec![activity(7, "Still here")]);
}

#[tokio::test]
async fn test_resync_swap_failure_keeps_old_mirror() {
    let (app, failing) = create_failing_test_app(MemoryStore::with_credential(fresh_credential()));
    app.store.upsert(&activity(1, "Old")).await.unwrap();
    app.provider.put_activity(activity(2, "New"));
    app.provider.put_activity(activity(3, "Newer"));
    failing.fail_replace.store(true, Ordering::SeqCst);

    let result = app.state.sync.resync_all(None).await;

    assert!(matches!(result, Err(AppError::StorageFailed(_))));
    assert_eq!(app.store.list().await.unwrap(), vec![activity(1, "Old")]);
}

#[tokio::test]
async fn test_refresh_save_failure_returns_error() {
    let stale = expired_credential();
    let (app, failing) = create_failing_test_app(MemoryStore::with_credential(stale.clone()));
    failing.fail_save.store(true, Ordering::SeqCst);

    let result = app.state.tokens.ensure_fresh().await;

    assert!(matches!(result, Err(AppError::StorageFailed(_))));
    assert_eq!(app.provider.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(app.store.load().await.unwrap(), Some(stale));
}

#[tokio::test]
async fn test_exchange_save_failure_returns_error() {
    let (app, failing) = create_failing_test_app(MemoryStore::default());
    failing.fail_save.store(true, Ordering::SeqCst);

    let result = app.state.tokens.exchange("good-code").await;

    assert!(matches!(result, Err(AppError::StorageFailed(_))));
    assert_eq!(app.store.load().await.unwrap(), None);
}
