// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Activities (volunteer calls)
//! - Enrollments (one document per activity/student pair)
//! - Attendance rosters (one per activity)
//! - Impact reports (one per activity)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Activity, AttendanceRoster, Enrollment, ImpactReport};
use firestore::errors::FirestoreError;
use futures_util::{stream, StreamExt};
use serde::{de::DeserializeOwned, Serialize};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;
// A commit aborted by a concurrent writer is retried against fresh data.
const MAX_TRANSACTION_ATTEMPTS: u32 = 5;
const RETRY_BACKOFF_MS: u64 = 25;

async fn retry_backoff(attempt: u32) {
    tokio::time::sleep(std::time::Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt))).await;
}

/// Result of a create-if-absent write.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome<T> {
    Created(T),
    /// A document already exists under that ID; carries the stored version.
    AlreadyExists(T),
}

/// Result of a transactional read-modify-write.
#[derive(Debug, Clone, PartialEq)]
pub enum Modified<T> {
    /// No document under that ID.
    Missing,
    /// The change was a no-op; nothing was written.
    Unchanged(T),
    Written(T),
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

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
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Client whose reads run inside `transaction`.
    ///
    /// Documents read through it are locked by the transaction, so a
    /// concurrent commit on them aborts one of the two writers.
    fn transactional(
        client: &firestore::FirestoreDb,
        transaction: &firestore::FirestoreTransaction<'_>,
    ) -> firestore::FirestoreDb {
        client.clone_with_consistency_selector(firestore::FirestoreConsistencySelector::Transaction(
            transaction.transaction_id().clone(),
        ))
    }

    // ─── Generic Helpers ─────────────────────────────────────────

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Upsert by document ID.
    async fn set_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let _: T = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Create-if-absent by document ID.
    ///
    /// Uniqueness is decided by Firestore, so two concurrent callers can never
    /// both see `Created` for the same ID.
    async fn insert_doc<T>(
        &self,
        collection: &str,
        id: &str,
        doc: &T,
    ) -> Result<InsertOutcome<T>, AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let result: Result<T, FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await;

        match result {
            Ok(created) => Ok(InsertOutcome::Created(created)),
            Err(FirestoreError::DataConflictError(_)) => {
                tracing::debug!(collection, id, "Document already exists");
                let existing = self.get_doc(collection, id).await?.ok_or_else(|| {
                    AppError::Database(format!("{}/{} vanished after conflict", collection, id))
                })?;
                Ok(InsertOutcome::AlreadyExists(existing))
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Read, change and write one document in a single transaction.
    ///
    /// `apply` edits the stored document in place and returns whether it
    /// changed. An error from `apply` aborts without writing. When the commit
    /// is aborted by a concurrent writer the whole step runs again, so
    /// `apply` always sees the latest committed version.
    async fn modify_doc<T, F>(
        &self,
        collection: &str,
        id: &str,
        apply: F,
    ) -> Result<Modified<T>, AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: Fn(&mut T) -> Result<bool, AppError>,
    {
        let client = self.get_client()?;
        let mut attempt = 1;

        loop {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            let stored: Option<T> = Self::transactional(client, &transaction)
                .fluent()
                .select()
                .by_id_in(collection)
                .obj()
                .one(id)
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to read {} in transaction: {}", id, e))
                })?;

            let Some(mut doc) = stored else {
                let _ = transaction.rollback().await;
                return Ok(Modified::Missing);
            };

            match apply(&mut doc) {
                Ok(true) => {}
                Ok(false) => {
                    let _ = transaction.rollback().await;
                    return Ok(Modified::Unchanged(doc));
                }
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(e);
                }
            }

            client
                .fluent()
                .update()
                .in_col(collection)
                .document_id(id)
                .object(&doc)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add {} to transaction: {}", id, e))
                })?;

            match transaction.commit().await {
                Ok(_) => return Ok(Modified::Written(doc)),
                Err(e) if attempt < MAX_TRANSACTION_ATTEMPTS => {
                    tracing::warn!(collection, id, attempt, error = %e, "Transaction aborted, retrying");
                    retry_backoff(attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(AppError::Database(format!("Transaction commit failed: {}", e)))
                }
            }
        }
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_docs<T>(&self, collection: &str) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .from(collection)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Activity Operations ─────────────────────────────────────

    pub async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>, AppError> {
        self.get_doc(collections::ACTIVITIES, activity_id).await
    }

    /// All activities in insertion order.
    pub async fn list_activities(&self) -> Result<Vec<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .order_by([("created_at", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn create_activity(&self, activity: &Activity) -> Result<(), AppError> {
        match self
            .insert_doc(collections::ACTIVITIES, &activity.id, activity)
            .await?
        {
            InsertOutcome::Created(_) => Ok(()),
            InsertOutcome::AlreadyExists(_) => Err(AppError::Conflict(format!(
                "Activity {} already exists",
                activity.id
            ))),
        }
    }

    /// Transactional read-modify-write of one activity.
    pub async fn modify_activity<F>(
        &self,
        activity_id: &str,
        apply: F,
    ) -> Result<Modified<Activity>, AppError>
    where
        F: Fn(&mut Activity) -> Result<bool, AppError>,
    {
        self.modify_doc(collections::ACTIVITIES, activity_id, apply)
            .await
    }

    pub async fn delete_activity(&self, activity_id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::ACTIVITIES, activity_id).await
    }

    // ─── Enrollment Operations ───────────────────────────────────

    pub async fn get_enrollment(&self, enrollment_id: &str) -> Result<Option<Enrollment>, AppError> {
        self.get_doc(collections::ENROLLMENTS, enrollment_id).await
    }

    /// Create the enrollment for its pair, or return the row already there.
    pub async fn create_enrollment(
        &self,
        enrollment: &Enrollment,
    ) -> Result<InsertOutcome<Enrollment>, AppError> {
        self.insert_doc(collections::ENROLLMENTS, &enrollment.id, enrollment)
            .await
    }

    /// Transactional read-modify-write of one enrollment.
    pub async fn modify_enrollment<F>(
        &self,
        enrollment_id: &str,
        apply: F,
    ) -> Result<Modified<Enrollment>, AppError>
    where
        F: Fn(&mut Enrollment) -> Result<bool, AppError>,
    {
        self.modify_doc(collections::ENROLLMENTS, enrollment_id, apply)
            .await
    }

    /// All enrollments of a student, any status, in no particular order.
    pub async fn list_enrollments_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<Enrollment>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ENROLLMENTS)
            .filter(|q| q.for_all([q.field("student_id").eq(student_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All enrollments of an activity, any status, in no particular order.
    pub async fn list_enrollments_for_activity(
        &self,
        activity_id: &str,
    ) -> Result<Vec<Enrollment>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ENROLLMENTS)
            .filter(|q| q.for_all([q.field("activity_id").eq(activity_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn list_enrollments(&self) -> Result<Vec<Enrollment>, AppError> {
        self.list_docs(collections::ENROLLMENTS).await
    }

    // ─── Roster Operations ───────────────────────────────────────

    pub async fn get_roster(&self, roster_id: &str) -> Result<Option<AttendanceRoster>, AppError> {
        self.get_doc(collections::ROSTERS, roster_id).await
    }

    pub async fn create_roster(
        &self,
        roster: &AttendanceRoster,
    ) -> Result<InsertOutcome<AttendanceRoster>, AppError> {
        self.insert_doc(collections::ROSTERS, &roster.id, roster)
            .await
    }

    pub async fn set_roster(&self, roster: &AttendanceRoster) -> Result<(), AppError> {
        self.set_doc(collections::ROSTERS, &roster.id, roster).await
    }

    pub async fn list_rosters(&self) -> Result<Vec<AttendanceRoster>, AppError> {
        self.list_docs(collections::ROSTERS).await
    }

    // ─── Report Operations ───────────────────────────────────────

    pub async fn get_report(&self, report_id: &str) -> Result<Option<ImpactReport>, AppError> {
        self.get_doc(collections::REPORTS, report_id).await
    }

    pub async fn set_report(&self, report: &ImpactReport) -> Result<(), AppError> {
        self.set_doc(collections::REPORTS, &report.id, report).await
    }

    pub async fn list_reports(&self) -> Result<Vec<ImpactReport>, AppError> {
        self.list_docs(collections::REPORTS).await
    }

    // ─── Bulk Reads ──────────────────────────────────────────────

    /// Fetch several activities by ID concurrently. Missing IDs are skipped.
    pub async fn get_activities_by_ids(&self, ids: &[String]) -> Result<Vec<Activity>, AppError> {
        let found = stream::iter(ids.iter().cloned())
            .map(|id| async move { self.get_activity(&id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<Activity>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<Activity>>, AppError>>()?;

        Ok(found.into_iter().flatten().collect())
    }

    // ─── Atomic Closure ──────────────────────────────────────────

    /// Close an activity and address its enrollments in one transaction.
    ///
    /// `close` receives the stored activity and all of its enrollments, read
    /// inside the transaction. It must transition the activity and keep only
    /// the enrollments it changed. Returns `None` if the activity is missing.
    ///
    /// A second closer either fails in `close` (the activity already reads as
    /// closed) or aborts at commit and is retried, so only one caller ever
    /// commits the transition. With more than `BATCH_SIZE - 1` enrollments to
    /// address, full chunks are committed first and the activity is written
    /// with the last one, so it only reads as closed once every enrollment
    /// write has landed.
    pub async fn close_activity_atomic<F>(
        &self,
        activity_id: &str,
        close: F,
    ) -> Result<Option<(Activity, Vec<Enrollment>)>, AppError>
    where
        F: Fn(&mut Activity, &mut Vec<Enrollment>) -> Result<(), AppError>,
    {
        let client = self.get_client()?;
        let mut addressed_total: Vec<Enrollment> = Vec::new();
        let mut attempt = 1;

        loop {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
            let tx_db = Self::transactional(client, &transaction);

            let stored: Option<Activity> = tx_db
                .fluent()
                .select()
                .by_id_in(collections::ACTIVITIES)
                .obj()
                .one(activity_id)
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to read activity in transaction: {}", e))
                })?;
            let Some(mut activity) = stored else {
                let _ = transaction.rollback().await;
                return Ok(None);
            };

            let mut addressed: Vec<Enrollment> = tx_db
                .fluent()
                .select()
                .from(collections::ENROLLMENTS)
                .filter(|q| q.for_all([q.field("activity_id").eq(activity_id)]))
                .obj()
                .query()
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to read enrollments in transaction: {}", e))
                })?;

            if let Err(e) = close(&mut activity, &mut addressed) {
                let _ = transaction.rollback().await;
                return Err(e);
            }

            // Rows addressed by an earlier chunk no longer qualify, so each
            // pass only sees what is left.
            let last_pass = addressed.len() < BATCH_SIZE;
            addressed.truncate(BATCH_SIZE - 1);

            for enrollment in &addressed {
                client
                    .fluent()
                    .update()
                    .in_col(collections::ENROLLMENTS)
                    .document_id(&enrollment.id)
                    .object(enrollment)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add enrollment to transaction: {}",
                            e
                        ))
                    })?;
            }

            if last_pass {
                client
                    .fluent()
                    .update()
                    .in_col(collections::ACTIVITIES)
                    .document_id(&activity.id)
                    .object(&activity)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add activity to transaction: {}",
                            e
                        ))
                    })?;
            }

            match transaction.commit().await {
                Ok(_) => {
                    addressed_total.extend(addressed);
                    if last_pass {
                        tracing::info!(
                            activity_id,
                            addressed = addressed_total.len(),
                            "Activity closed atomically"
                        );
                        return Ok(Some((activity, addressed_total)));
                    }
                    attempt = 1;
                }
                Err(e) if attempt < MAX_TRANSACTION_ATTEMPTS => {
                    tracing::warn!(activity_id, attempt, error = %e, "Closure transaction aborted, retrying");
                    retry_backoff(attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(AppError::Database(format!("Transaction commit failed: {}", e)))
                }
            }
        }
    }
}
