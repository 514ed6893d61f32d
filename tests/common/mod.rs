// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use strava2cal::config::Config;
use strava2cal::db::{ActivityStore, CredentialStore, MemoryStore, Stores};
use strava2cal::error::{ProviderError, StorageError};
use strava2cal::models::{Activity, Credential};
use strava2cal::routes::create_router;
use strava2cal::services::ProviderClient;
use strava2cal::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

#[allow(dead_code)]
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Credential valid for the next six hours.
#[allow(dead_code)]
pub fn fresh_credential() -> Credential {
    Credential {
        access_token: "stored-access".to_string(),
        refresh_token: "stored-refresh".to_string(),
        expires_at: now_secs() + 6 * 3600,
    }
}

/// Credential that already expired.
#[allow(dead_code)]
pub fn expired_credential() -> Credential {
    Credential {
        access_token: "stale-access".to_string(),
        refresh_token: "stale-refresh".to_string(),
        expires_at: now_secs() - 60,
    }
}

#[allow(dead_code)]
pub fn parse_time(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .expect("valid RFC3339 in test")
        .with_timezone(&Utc)
}

/// Canonical activity starting on 2024-01-01 plus `id` hours.
#[allow(dead_code)]
pub fn activity(id: u64, name: &str) -> Activity {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(id as i64);
    Activity {
        id,
        name: name.to_string(),
        distance: 5000.0,
        elevation_gain: 30.0,
        elapsed_time_secs: 1500,
        average_speed: 5000.0 / 1500.0,
        average_watts: 0.0,
        average_cadence: 0.0,
        timezone: "(GMT+00:00) Europe/London".to_string(),
        activity_type: "Run".to_string(),
        start_time: start,
        end_time: start + Duration::seconds(1500),
    }
}

/// Scripted stand-in for Strava.
///
/// Upstream activities live in `activities`; every call is counted and can
/// be delayed or made to fail.
#[derive(Default)]
pub struct FakeProvider {
    pub activities: Mutex<BTreeMap<u64, Activity>>,
    pub subscriptions: Mutex<Vec<u64>>,
    next_subscription_id: AtomicU64,

    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub list_calls: AtomicUsize,

    pub fail_exchange: AtomicBool,
    pub fail_refresh: AtomicBool,
    pub fail_get: AtomicBool,
    pub fail_list: AtomicBool,
    pub fail_subscriptions: AtomicBool,

    /// Milliseconds each refresh / list call sleeps before answering.
    pub refresh_delay_ms: AtomicU64,
    pub list_delay_ms: AtomicU64,

    /// Access tokens seen by activity calls, in order.
    pub seen_tokens: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_subscription_id: AtomicU64::new(1000),
            ..Default::default()
        })
    }

    pub fn put_activity(&self, activity: Activity) {
        self.activities.lock().unwrap().insert(activity.id, activity);
    }

    pub fn remove_activity(&self, id: u64) {
        self.activities.lock().unwrap().remove(&id);
    }

    fn issued(&self, n: usize) -> Credential {
        Credential {
            access_token: format!("access-{}", n),
            refresh_token: format!("refresh-{}", n),
            expires_at: now_secs() + 6 * 3600,
        }
    }

    fn failure() -> ProviderError {
        ProviderError::Status {
            status: 500,
            body: "scripted failure".to_string(),
        }
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    async fn exchange_code(&self, code: &str) -> Result<Credential, ProviderError> {
        let n = self.exchange_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_exchange.load(Ordering::SeqCst) || code == "bad-code" {
            return Err(ProviderError::Status {
                status: 400,
                body: "invalid code".to_string(),
            });
        }
        Ok(self.issued(n))
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<Credential, ProviderError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.refresh_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(ProviderError::Unauthorized);
        }
        Ok(self.issued(n))
    }

    async fn get_activity(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<Activity, ProviderError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_tokens
            .lock()
            .unwrap()
            .push(access_token.to_string());
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        self.activities
            .lock()
            .unwrap()
            .get(&activity_id)
            .cloned()
            .ok_or(ProviderError::Status {
                status: 404,
                body: "Record Not Found".to_string(),
            })
    }

    async fn list_activities(&self, access_token: &str) -> Result<Vec<Activity>, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_tokens
            .lock()
            .unwrap()
            .push(access_token.to_string());
        let delay = self.list_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        Ok(self.activities.lock().unwrap().values().cloned().collect())
    }

    async fn create_subscription(
        &self,
        _callback_url: &str,
        _verify_token: &str,
    ) -> Result<u64, ProviderError> {
        if self.fail_subscriptions.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        let id = self.next_subscription_id.fetch_add(1, Ordering::SeqCst);
        self.subscriptions.lock().unwrap().push(id);
        Ok(id)
    }

    async fn list_subscriptions(&self) -> Result<Vec<u64>, ProviderError> {
        if self.fail_subscriptions.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        Ok(self.subscriptions.lock().unwrap().clone())
    }

    async fn delete_subscription(&self, subscription_id: u64) -> Result<(), ProviderError> {
        if self.fail_subscriptions.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        let mut subs = self.subscriptions.lock().unwrap();
        let before = subs.len();
        subs.retain(|id| *id != subscription_id);
        if subs.len() == before {
            return Err(ProviderError::Status {
                status: 404,
                body: "Record Not Found".to_string(),
            });
        }
        Ok(())
    }
}

/// Memory store whose writes can be made to fail.
///
/// Reads always go through; a failed write leaves `inner` untouched.
#[derive(Default)]
pub struct FailingStore {
    pub inner: Arc<MemoryStore>,
    pub fail_save: AtomicBool,
    pub fail_upsert: AtomicBool,
    pub fail_remove: AtomicBool,
    pub fail_replace: AtomicBool,
}

#[allow(dead_code)]
impl FailingStore {
    pub fn wrap(inner: MemoryStore) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(inner),
            ..Default::default()
        })
    }

    fn check(flag: &AtomicBool) -> Result<(), StorageError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("scripted write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FailingStore {
    async fn load(&self) -> Result<Option<Credential>, StorageError> {
        self.inner.load().await
    }

    async fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        Self::check(&self.fail_save)?;
        self.inner.save(credential).await
    }

    async fn load_subscription_id(&self) -> Result<Option<u64>, StorageError> {
        self.inner.load_subscription_id().await
    }

    async fn save_subscription_id(&self, id: u64) -> Result<(), StorageError> {
        Self::check(&self.fail_save)?;
        self.inner.save_subscription_id(id).await
    }

    async fn clear_subscription_id(&self) -> Result<(), StorageError> {
        Self::check(&self.fail_save)?;
        self.inner.clear_subscription_id().await
    }
}

#[async_trait]
impl ActivityStore for FailingStore {
    async fn list(&self) -> Result<Vec<Activity>, StorageError> {
        self.inner.list().await
    }

    async fn upsert(&self, activity: &Activity) -> Result<(), StorageError> {
        Self::check(&self.fail_upsert)?;
        self.inner.upsert(activity).await
    }

    async fn remove(&self, id: u64) -> Result<(), StorageError> {
        Self::check(&self.fail_remove)?;
        self.inner.remove(id).await
    }

    async fn replace_all(&self, activities: &[Activity]) -> Result<(), StorageError> {
        Self::check(&self.fail_replace)?;
        self.inner.replace_all(activities).await
    }
}

/// Router plus handles on everything behind it.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub provider: Arc<FakeProvider>,
    pub store: Arc<MemoryStore>,
}

/// Create a test app over in-memory storage and a fake provider.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(MemoryStore::default())
}

/// Same as [`create_test_app`] with a pre-built store.
#[allow(dead_code)]
pub fn create_test_app_with(store: MemoryStore) -> TestApp {
    let config = Config::test_default();
    let provider = FakeProvider::new();
    let store = Arc::new(store);

    let state = Arc::new(AppState::new(
        config,
        provider.clone(),
        Stores::shared(store.clone()),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        provider,
        store,
    }
}

/// Test app whose state writes through a [`FailingStore`].
///
/// `TestApp::store` is the wrapped memory store, for inspecting what landed.
#[allow(dead_code)]
pub fn create_failing_test_app(store: MemoryStore) -> (TestApp, Arc<FailingStore>) {
    let config = Config::test_default();
    let provider = FakeProvider::new();
    let failing = FailingStore::wrap(store);

    let state = Arc::new(AppState::new(
        config,
        provider.clone(),
        Stores::shared(failing.clone()),
    ));

    let app = TestApp {
        router: create_router(state.clone()),
        state,
        provider,
        store: failing.inner.clone(),
    };
    (app, failing)
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[allow(dead_code)]
pub async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}
