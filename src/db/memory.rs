//! In-process storage backend (tests and throwaway deployments).

use crate::db::{ActivityStore, CredentialStore};
use crate::error::StorageError;
use crate::models::{Activity, Credential};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

/// Everything held in memory behind std locks; no lock is held across an await.
#[derive(Default)]
pub struct MemoryStore {
    credential: Mutex<Option<Credential>>,
    subscription_id: Mutex<Option<u64>>,
    activities: RwLock<HashMap<u64, Activity>>,
}

impl MemoryStore {
    /// Store pre-seeded with a credential.
    pub fn with_credential(credential: Credential) -> Self {
        let store = Self::default();
        *store.credential.lock().unwrap_or_else(|e| e.into_inner()) = Some(credential);
        store
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Backend("memory store lock poisoned".to_string())
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn load(&self) -> Result<Option<Credential>, StorageError> {
        Ok(self.credential.lock().map_err(poisoned)?.clone())
    }

    async fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        *self.credential.lock().map_err(poisoned)? = Some(credential.clone());
        Ok(())
    }

    async fn load_subscription_id(&self) -> Result<Option<u64>, StorageError> {
        Ok(*self.subscription_id.lock().map_err(poisoned)?)
    }

    async fn save_subscription_id(&self, id: u64) -> Result<(), StorageError> {
        *self.subscription_id.lock().map_err(poisoned)? = Some(id);
        Ok(())
    }

    async fn clear_subscription_id(&self) -> Result<(), StorageError> {
        *self.subscription_id.lock().map_err(poisoned)? = None;
        Ok(())
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Activity>, StorageError> {
        Ok(self
            .activities
            .read()
            .map_err(poisoned)?
            .values()
            .cloned()
            .collect())
    }

    async fn upsert(&self, activity: &Activity) -> Result<(), StorageError> {
        self.activities
            .write()
            .map_err(poisoned)?
            .insert(activity.id, activity.clone());
        Ok(())
    }

    async fn remove(&self, id: u64) -> Result<(), StorageError> {
        self.activities.write().map_err(poisoned)?.remove(&id);
        Ok(())
    }

    async fn replace_all(&self, activities: &[Activity]) -> Result<(), StorageError> {
        let fresh: HashMap<u64, Activity> =
            activities.iter().map(|a| (a.id, a.clone())).collect();
        *self.activities.write().map_err(poisoned)? = fresh;
        Ok(())
    }
}
