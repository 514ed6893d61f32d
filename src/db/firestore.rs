// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore storage backend.
//!
//! Layout:
//! - `credentials/strava` (the single OAuth credential)
//! - `subscriptions/current` (the registered webhook subscription)
//! - `activities/{activity_id}` (the activity mirror)

use crate::db::{collections, ActivityStore, CredentialStore};
use crate::error::StorageError;
use crate::models::{Activity, Credential};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const CREDENTIAL_DOC_ID: &str = "strava";
const SUBSCRIPTION_DOC_ID: &str = "current";

/// Stored webhook subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SubscriptionRecord {
    id: u64,
}

fn backend<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StorageError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            StorageError::Backend(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StorageError> {
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StorageError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }
}

#[async_trait]
impl CredentialStore for FirestoreStore {
    async fn load(&self) -> Result<Option<Credential>, StorageError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::CREDENTIALS)
            .obj()
            .one(CREDENTIAL_DOC_ID)
            .await
            .map_err(backend)
    }

    async fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::CREDENTIALS)
            .document_id(CREDENTIAL_DOC_ID)
            .object(credential)
            .execute()
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn load_subscription_id(&self) -> Result<Option<u64>, StorageError> {
        let record: Option<SubscriptionRecord> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::SUBSCRIPTIONS)
            .obj()
            .one(SUBSCRIPTION_DOC_ID)
            .await
            .map_err(backend)?;
        Ok(record.map(|r| r.id))
    }

    async fn save_subscription_id(&self, id: u64) -> Result<(), StorageError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::SUBSCRIPTIONS)
            .document_id(SUBSCRIPTION_DOC_ID)
            .object(&SubscriptionRecord { id })
            .execute()
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn clear_subscription_id(&self) -> Result<(), StorageError> {
        self.client
            .fluent()
            .delete()
            .from(collections::SUBSCRIPTIONS)
            .document_id(SUBSCRIPTION_DOC_ID)
            .execute()
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl ActivityStore for FirestoreStore {
    async fn list(&self) -> Result<Vec<Activity>, StorageError> {
        self.client
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .obj()
            .query()
            .await
            .map_err(backend)
    }

    async fn upsert(&self, activity: &Activity) -> Result<(), StorageError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(activity.id.to_string())
            .object(activity)
            .execute()
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn remove(&self, id: u64) -> Result<(), StorageError> {
        // Firestore deletes of missing documents succeed.
        self.client
            .fluent()
            .delete()
            .from(collections::ACTIVITIES)
            .document_id(id.to_string())
            .execute()
            .await
            .map_err(backend)?;
        Ok(())
    }

    /// Writes the new set and deletes stale documents in a single transaction.
    ///
    /// No chunking: splitting the swap across commits would expose a mixed
    /// mirror if a later chunk failed. A set too large for one commit fails
    /// as a whole and leaves the collection unchanged.
    async fn replace_all(&self, activities: &[Activity]) -> Result<(), StorageError> {
        let existing = self.list().await?;
        let keep: HashSet<u64> = activities.iter().map(|a| a.id).collect();
        let stale: Vec<u64> = existing
            .iter()
            .map(|a| a.id)
            .filter(|id| !keep.contains(id))
            .collect();

        let mut transaction = self.client.begin_transaction().await.map_err(|e| {
            StorageError::Backend(format!("Failed to begin transaction: {}", e))
        })?;

        for id in &stale {
            self.client
                .fluent()
                .delete()
                .from(collections::ACTIVITIES)
                .document_id(id.to_string())
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    StorageError::Backend(format!(
                        "Failed to add deletion to transaction: {}",
                        e
                    ))
                })?;
        }

        for activity in activities {
            self.client
                .fluent()
                .update()
                .in_col(collections::ACTIVITIES)
                .document_id(activity.id.to_string())
                .object(activity)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    StorageError::Backend(format!(
                        "Failed to add activity to transaction: {}",
                        e
                    ))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| StorageError::Backend(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            written = activities.len(),
            deleted = stale.len(),
            "Activity mirror replaced"
        );

        Ok(())
    }
}
