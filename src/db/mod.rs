//! Storage layer.
//!
//! The rest of the application only talks to the [`CredentialStore`] and
//! [`ActivityStore`] traits; which backend sits behind them is decided once
//! at startup by [`open_stores`].

pub mod file;
pub mod firestore;
pub mod memory;

pub use file::FileStore;
pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::config::{Config, StorageBackend};
use crate::error::StorageError;
use crate::models::{Activity, Credential};
use async_trait::async_trait;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const CREDENTIALS: &str = "credentials";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    pub const ACTIVITIES: &str = "activities";
}

/// Durable home of the single Strava credential and webhook subscription ID.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<Credential>, StorageError>;

    async fn save(&self, credential: &Credential) -> Result<(), StorageError>;

    async fn load_subscription_id(&self) -> Result<Option<u64>, StorageError>;

    async fn save_subscription_id(&self, id: u64) -> Result<(), StorageError>;

    async fn clear_subscription_id(&self) -> Result<(), StorageError>;
}

/// Durable activity mirror, keyed by Strava activity ID.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Activity>, StorageError>;

    /// Insert or overwrite the record with the same ID.
    async fn upsert(&self, activity: &Activity) -> Result<(), StorageError>;

    /// Remove by ID. Removing an unknown ID succeeds.
    async fn remove(&self, id: u64) -> Result<(), StorageError>;

    /// Swap the whole mirror for `activities`: either all of it lands or nothing changes.
    async fn replace_all(&self, activities: &[Activity]) -> Result<(), StorageError>;
}

/// Both store handles, usually backed by the same object.
#[derive(Clone)]
pub struct Stores {
    pub credentials: Arc<dyn CredentialStore>,
    pub activities: Arc<dyn ActivityStore>,
}

impl Stores {
    /// Use one backend for both concerns.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: CredentialStore + ActivityStore + 'static,
    {
        Self {
            credentials: store.clone(),
            activities: store,
        }
    }
}

/// Open the backend selected by configuration.
pub async fn open_stores(config: &Config) -> Result<Stores, StorageError> {
    match &config.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; state is lost on restart");
            Ok(Stores::shared(Arc::new(MemoryStore::default())))
        }
        StorageBackend::File(path) => {
            let store = FileStore::open(path).await?;
            tracing::info!(path = %path.display(), "Using file storage");
            Ok(Stores::shared(Arc::new(store)))
        }
        StorageBackend::Firestore { project_id } => {
            let store = FirestoreStore::new(project_id).await?;
            Ok(Stores::shared(Arc::new(store)))
        }
    }
}
