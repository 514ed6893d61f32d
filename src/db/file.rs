//! Single-file JSON storage backend.
//!
//! The whole state (credential, subscription, activity mirror) lives in one
//! document. Every mutation writes a sibling temp file and renames it over
//! the original, so readers of the file never observe a half-written state.

use crate::db::{ActivityStore, CredentialStore};
use crate::error::StorageError;
use crate::models::{Activity, Credential};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    credential: Option<Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subscription_id: Option<u64>,
    #[serde(default)]
    activities: Vec<Activity>,
}

/// JSON state file with an in-memory copy of its last committed contents.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<StateDocument>,
}

impl FileStore {
    /// Open (or lazily create) the state file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => StateDocument::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StateDocument::default(),
            Err(e) => return Err(e.into()),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::debug!(
            path = %path.display(),
            activities = state.activities.len(),
            "State file loaded"
        );

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Apply `change` to a copy of the state, persist it, then commit it in memory.
    async fn mutate<F>(&self, change: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut StateDocument),
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        change(&mut next);
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    async fn persist(&self, doc: &StateDocument) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(doc)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &data).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn load(&self) -> Result<Option<Credential>, StorageError> {
        Ok(self.state.lock().await.credential.clone())
    }

    async fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        let credential = credential.clone();
        self.mutate(move |doc| doc.credential = Some(credential))
            .await
    }

    async fn load_subscription_id(&self) -> Result<Option<u64>, StorageError> {
        Ok(self.state.lock().await.subscription_id)
    }

    async fn save_subscription_id(&self, id: u64) -> Result<(), StorageError> {
        self.mutate(move |doc| doc.subscription_id = Some(id)).await
    }

    async fn clear_subscription_id(&self) -> Result<(), StorageError> {
        self.mutate(|doc| doc.subscription_id = None).await
    }
}

#[async_trait]
impl ActivityStore for FileStore {
    async fn list(&self) -> Result<Vec<Activity>, StorageError> {
        Ok(self.state.lock().await.activities.clone())
    }

    async fn upsert(&self, activity: &Activity) -> Result<(), StorageError> {
        let activity = activity.clone();
        self.mutate(move |doc| {
            match doc.activities.iter_mut().find(|a| a.id == activity.id) {
                Some(existing) => *existing = activity,
                None => doc.activities.push(activity),
            }
        })
        .await
    }

    async fn remove(&self, id: u64) -> Result<(), StorageError> {
        self.mutate(move |doc| doc.activities.retain(|a| a.id != id))
            .await
    }

    async fn replace_all(&self, activities: &[Activity]) -> Result<(), StorageError> {
        // Later duplicates win, matching repeated upserts.
        let mut index: HashMap<u64, usize> = HashMap::with_capacity(activities.len());
        let mut fresh: Vec<Activity> = Vec::with_capacity(activities.len());
        for activity in activities {
            match index.get(&activity.id) {
                Some(&pos) => fresh[pos] = activity.clone(),
                None => {
                    index.insert(activity.id, fresh.len());
                    fresh.push(activity.clone());
                }
            }
        }
        self.mutate(move |doc| doc.activities = fresh).await
    }
}
