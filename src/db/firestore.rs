// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Categories (seeded reference data)
//! - Activities (logged activity records)
//! - Profiles (per-user aggregate totals)
//! - Leaderboard (denormalized copy of profiles)
//! - Certificates

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::{BackoffError, FirestoreError};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::memory::DEFAULT_DISPLAY_NAME;
use crate::db::{collections, newest_first, ActivityQueryCursor, Store};
use crate::error::AppError;
use crate::models::category::seed_categories;
use crate::models::{
    ActivityCategory, ActivityChange, ActivityRecord, Certificate, LeaderboardEntry,
    ProfileUpdate, UserAggregate,
};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Stored form of an activity.
///
/// Timestamps are kept as integer microseconds next to the record so
/// queries can order and page on them; RFC 3339 strings do not sort
/// reliably when fractional seconds vary in length.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActivityDoc {
    id: Uuid,
    user_id: String,
    category_id: String,
    description: String,
    quantity: f64,
    carbon_amount: f64,
    green_points_earned: i64,
    logged_at: DateTime<Utc>,
    logged_at_micros: i64,
}

impl From<&ActivityRecord> for ActivityDoc {
    fn from(r: &ActivityRecord) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id.clone(),
            category_id: r.category_id.clone(),
            description: r.description.clone(),
            quantity: r.quantity,
            carbon_amount: r.carbon_amount,
            green_points_earned: r.green_points_earned,
            logged_at: r.logged_at,
            logged_at_micros: r.logged_at.timestamp_micros(),
        }
    }
}

impl From<ActivityDoc> for ActivityRecord {
    fn from(d: ActivityDoc) -> Self {
        Self {
            id: d.id,
            user_id: d.user_id,
            category_id: d.category_id,
            description: d.description,
            quantity: d.quantity,
            carbon_amount: d.carbon_amount,
            green_points_earned: d.green_points_earned,
            logged_at: d.logged_at,
        }
    }
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
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
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

    /// Create an offline client. All operations return `AppError::Database`.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Write the built-in category catalog, overwriting existing entries.
    pub async fn seed_categories(&self) -> Result<usize, AppError> {
        let categories = seed_categories();
        for category in &categories {
            let _: () = self
                .get_client()?
                .fluent()
                .update()
                .in_col(collections::CATEGORIES)
                .document_id(&category.id)
                .object(category)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        tracing::info!(count = categories.len(), "Seeded activity categories");
        Ok(categories.len())
    }

    /// Full history for a user, unordered.
    async fn all_activities_for_user(&self, user_id: &str) -> Result<Vec<ActivityRecord>, AppError> {
        query_history(self.get_client()?, user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete(&self, doc_ids: &[String], collection: &str) -> Result<(), AppError> {
        let client = self.get_client()?;

        for chunk in doc_ids.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for doc_id in chunk {
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

type TxResult<T> = Result<T, BackoffError<AppError>>;

/// Wrap a store error raised inside a transaction body. Contention is
/// retried by the transaction runner; anything else aborts it.
fn tx_error(e: FirestoreError, what: &str) -> BackoffError<AppError> {
    let retry_possible = matches!(&e, FirestoreError::DatabaseError(db_err) if db_err.retry_possible);
    let err = AppError::Database(format!("{}: {}", what, e));
    if retry_possible {
        BackoffError::transient(err)
    } else {
        BackoffError::permanent(err)
    }
}

/// Recover the error a transaction body aborted with.
fn from_transaction(e: FirestoreError) -> AppError {
    match e {
        FirestoreError::ErrorInTransaction(e) => match e.source.downcast::<AppError>() {
            Ok(err) => *err,
            Err(other) => AppError::Database(format!("Transaction failed: {}", other)),
        },
        other => AppError::Database(format!("Transaction failed: {}", other)),
    }
}

async fn query_history(
    db: &firestore::FirestoreDb,
    user_id: &str,
) -> firestore::FirestoreResult<Vec<ActivityRecord>> {
    let user_id = user_id.to_string();
    let docs: Vec<ActivityDoc> = db
        .fluent()
        .select()
        .from(collections::ACTIVITIES)
        .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
        .obj()
        .query()
        .await?;
    Ok(docs.into_iter().map(ActivityRecord::from).collect())
}

/// Reads below take a transaction-bound handle, so Firestore tracks the
/// documents and rejects the commit if another writer touched them.
async fn read_activity(db: &firestore::FirestoreDb, activity_id: Uuid) -> TxResult<Option<ActivityRecord>> {
    let doc: Option<ActivityDoc> = db
        .fluent()
        .select()
        .by_id_in(collections::ACTIVITIES)
        .obj()
        .one(&activity_id.to_string())
        .await
        .map_err(|e| tx_error(e, "Failed to read activity"))?;
    Ok(doc.map(ActivityRecord::from))
}

async fn read_profile(db: &firestore::FirestoreDb, user_id: &str) -> TxResult<Option<UserAggregate>> {
    db.fluent()
        .select()
        .by_id_in(collections::PROFILES)
        .obj()
        .one(user_id)
        .await
        .map_err(|e| tx_error(e, "Failed to read profile"))
}

/// Optimistic check that the stored record is the one the change was built from.
fn check_precondition(
    record_id: Uuid,
    expected: Option<&ActivityRecord>,
    current: Option<&ActivityRecord>,
) -> Result<(), AppError> {
    match (expected, current) {
        (None, None) => Ok(()),
        (None, Some(_)) => Err(AppError::Conflict(format!(
            "Activity {} already exists",
            record_id
        ))),
        (Some(_), None) => Err(AppError::NotFound(format!(
            "Activity {} not found",
            record_id
        ))),
        (Some(old), Some(current)) if old != current => Err(AppError::Conflict(format!(
            "Activity {} was modified concurrently",
            record_id
        ))),
        (Some(_), Some(_)) => Ok(()),
    }
}

/// Queue profile + leaderboard writes for an aggregate onto a transaction.
fn queue_aggregate_writes(
    db: &firestore::FirestoreDb,
    transaction: &mut firestore::FirestoreTransaction<'_>,
    aggregate: &UserAggregate,
    entry: &LeaderboardEntry,
) -> Result<(), AppError> {
    db.fluent()
        .update()
        .in_col(collections::PROFILES)
        .document_id(&aggregate.user_id)
        .object(aggregate)
        .add_to_transaction(transaction)
        .map_err(|e| AppError::Database(format!("Failed to add profile to transaction: {}", e)))?;

    db.fluent()
        .update()
        .in_col(collections::LEADERBOARD)
        .document_id(&entry.user_id)
        .object(entry)
        .add_to_transaction(transaction)
        .map_err(|e| {
            AppError::Database(format!("Failed to add leaderboard row to transaction: {}", e))
        })?;

    Ok(())
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── Category Operations ─────────────────────────────────────

    async fn list_categories(&self) -> Result<Vec<ActivityCategory>, AppError> {
        let mut categories: Vec<ActivityCategory> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::CATEGORIES)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, category_id: &str) -> Result<Option<ActivityCategory>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CATEGORIES)
            .obj()
            .one(category_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Activity Operations ─────────────────────────────────────

    async fn get_activity(&self, activity_id: Uuid) -> Result<Option<ActivityRecord>, AppError> {
        let doc: Option<ActivityDoc> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(&activity_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(doc.map(ActivityRecord::from))
    }

    async fn list_activities_for_user(
        &self,
        user_id: &str,
        cursor: Option<ActivityQueryCursor>,
        limit: Option<u32>,
    ) -> Result<Vec<ActivityRecord>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES);

        let user_id = user_id.to_string();
        let query = if let Some(c) = cursor {
            // Inclusive bound; rows already returned at the same instant are
            // dropped below using the full (timestamp, id) cursor.
            let micros = c.logged_at.timestamp_micros();
            query.filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("logged_at_micros").less_than_or_equal(micros),
                ])
            })
        } else {
            query.filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
        };

        let query = query.order_by([
            ("logged_at_micros", firestore::FirestoreQueryDirection::Descending),
            ("id", firestore::FirestoreQueryDirection::Descending),
        ]);
        let query = match limit {
            Some(limit) => query.limit(limit),
            None => query,
        };

        let docs: Vec<ActivityDoc> = query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut records: Vec<ActivityRecord> = docs
            .into_iter()
            .map(ActivityRecord::from)
            .filter(|r| cursor.map_or(true, |c| c.is_before(r)))
            .collect();
        records.sort_by(newest_first);
        Ok(records)
    }

    /// Atomically apply an activity change: the record write or delete, the
    /// owner's aggregate and the leaderboard row commit together.
    ///
    /// The precondition is checked against a fresh read; if another request
    /// changed the record first the change is rejected with `Conflict`.
    async fn commit_activity_change(
        &self,
        change: &ActivityChange,
        now: DateTime<Utc>,
    ) -> Result<LeaderboardEntry, AppError> {
        let user_id = change.user_id().to_string();
        let record_id = match change {
            ActivityChange::Inserted(record)
            | ActivityChange::Updated { old: record, .. }
            | ActivityChange::Deleted(record) => record.id,
        };

        let entry = self
            .get_client()?
            .run_transaction(|db, transaction| {
                let change = change.clone();
                async move {
                    let (user_id, expected) = match &change {
                        ActivityChange::Inserted(record) => (record.user_id.as_str(), None),
                        ActivityChange::Updated { old, .. } | ActivityChange::Deleted(old) => {
                            (old.user_id.as_str(), Some(old))
                        }
                    };

                    // 1. Check the record precondition
                    let current = read_activity(&db, record_id).await?;
                    check_precondition(record_id, expected, current.as_ref())
                        .map_err(BackoffError::permanent)?;

                    // 2. Read the aggregate (zero baseline if first seen) and apply the delta
                    let mut aggregate = read_profile(&db, user_id)
                        .await?
                        .unwrap_or_else(|| UserAggregate::new(user_id, DEFAULT_DISPLAY_NAME, now));
                    aggregate
                        .apply_delta(change.delta(), now)
                        .map_err(|e| BackoffError::permanent(AppError::from(e)))?;
                    let entry = LeaderboardEntry::from(&aggregate);

                    // 3. Queue the record mutation
                    match &change {
                        ActivityChange::Inserted(record)
                        | ActivityChange::Updated { new: record, .. } => {
                            db.fluent()
                                .update()
                                .in_col(collections::ACTIVITIES)
                                .document_id(record.id.to_string())
                                .object(&ActivityDoc::from(record))
                                .add_to_transaction(&mut *transaction)
                                .map_err(|e| {
                                    BackoffError::permanent(AppError::Database(format!(
                                        "Failed to add activity to transaction: {}",
                                        e
                                    )))
                                })?;
                        }
                        ActivityChange::Deleted(record) => {
                            db.fluent()
                                .delete()
                                .from(collections::ACTIVITIES)
                                .document_id(record.id.to_string())
                                .add_to_transaction(&mut *transaction)
                                .map_err(|e| {
                                    BackoffError::permanent(AppError::Database(format!(
                                        "Failed to add deletion to transaction: {}",
                                        e
                                    )))
                                })?;
                        }
                    }

                    // 4. Aggregate and leaderboard writes; the runner commits
                    queue_aggregate_writes(&db, transaction, &aggregate, &entry)
                        .map_err(BackoffError::permanent)?;

                    Ok::<_, BackoffError<AppError>>(entry)
                }
                .boxed()
            })
            .await
            .map_err(from_transaction)?;

        tracing::info!(
            user_id = %user_id,
            activity_id = %record_id,
            total_carbon = entry.total_carbon_footprint,
            total_points = entry.total_green_points,
            "Activity change committed atomically"
        );

        Ok(entry)
    }

    // ─── Profile Operations ──────────────────────────────────────

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserAggregate>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROFILES)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn ensure_profile(
        &self,
        user_id: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(UserAggregate, Option<LeaderboardEntry>), AppError> {
        let (aggregate, created) = self
            .get_client()?
            .run_transaction(|db, transaction| {
                let user_id = user_id.to_string();
                let display_name = display_name.to_string();
                async move {
                    // Read in the transaction so a concurrent first write
                    // forces a retry that sees the stored row.
                    if let Some(existing) = read_profile(&db, &user_id).await? {
                        return Ok((existing, None));
                    }

                    let history = query_history(&db, &user_id)
                        .await
                        .map_err(|e| tx_error(e, "Failed to read history"))?;
                    let aggregate =
                        UserAggregate::backfilled(&user_id, &display_name, &history, now);
                    let entry = LeaderboardEntry::from(&aggregate);
                    queue_aggregate_writes(&db, transaction, &aggregate, &entry)
                        .map_err(BackoffError::permanent)?;

                    Ok::<_, BackoffError<AppError>>((aggregate, Some((entry, history.len()))))
                }
                .boxed()
            })
            .await
            .map_err(from_transaction)?;

        let Some((entry, backfilled)) = created else {
            return Ok((aggregate, None));
        };
        tracing::info!(user_id, backfilled, "Created user aggregate");

        Ok((aggregate, Some(entry)))
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<(UserAggregate, LeaderboardEntry), AppError> {
        let (aggregate, entry) = self
            .get_client()?
            .run_transaction(|db, transaction| {
                let user_id = user_id.to_string();
                let update = update.clone();
                async move {
                    // Totals come from the transactional read, so a racing
                    // activity commit is never overwritten.
                    let mut aggregate = read_profile(&db, &user_id)
                        .await?
                        .unwrap_or_else(|| UserAggregate::new(&user_id, DEFAULT_DISPLAY_NAME, now));

                    if let Some(name) = &update.display_name {
                        aggregate.display_name = name.clone();
                    }
                    if let Some(show) = update.show_on_leaderboard {
                        aggregate.show_on_leaderboard = show;
                    }
                    aggregate.updated_at = now;
                    let entry = LeaderboardEntry::from(&aggregate);

                    queue_aggregate_writes(&db, transaction, &aggregate, &entry)
                        .map_err(BackoffError::permanent)?;

                    Ok::<_, BackoffError<AppError>>((aggregate, entry))
                }
                .boxed()
            })
            .await
            .map_err(from_transaction)?;

        tracing::info!(user_id, "Profile updated");
        Ok((aggregate, entry))
    }

    // ─── Leaderboard Operations ──────────────────────────────────

    async fn leaderboard_entries(&self) -> Result<Vec<LeaderboardEntry>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::LEADERBOARD)
            .filter(|q| q.for_all([q.field("visible").eq(true)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Certificate Operations ──────────────────────────────────

    async fn save_certificate(&self, certificate: &Certificate) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CERTIFICATES)
            .document_id(certificate.id.to_string())
            .object(certificate)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_certificates(&self, user_id: &str) -> Result<Vec<Certificate>, AppError> {
        let user_id = user_id.to_string();
        let mut certificates: Vec<Certificate> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::CERTIFICATES)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        certificates.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(certificates)
    }

    // ─── User Data Deletion ──────────────────────────────────────

    /// Delete ALL data for a user.
    ///
    /// Deletes from all collections:
    /// - `activities` (query by user_id)
    /// - `certificates` (query by user_id)
    /// - `leaderboard/{user_id}`
    /// - `profiles/{user_id}`
    ///
    /// Returns the number of documents deleted.
    async fn delete_user_data(&self, user_id: &str) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        // 1. Delete all activities
        let activity_ids: Vec<String> = self
            .all_activities_for_user(user_id)
            .await?
            .iter()
            .map(|r| r.id.to_string())
            .collect();
        self.batch_delete(&activity_ids, collections::ACTIVITIES)
            .await?;
        deleted_count += activity_ids.len();
        tracing::debug!(user_id, count = activity_ids.len(), "Deleted activities");

        // 2. Delete certificates
        let certificate_ids: Vec<String> = self
            .list_certificates(user_id)
            .await?
            .iter()
            .map(|c| c.id.to_string())
            .collect();
        self.batch_delete(&certificate_ids, collections::CERTIFICATES)
            .await?;
        deleted_count += certificate_ids.len();
        tracing::debug!(user_id, count = certificate_ids.len(), "Deleted certificates");

        // 3. Delete the leaderboard row, then the aggregate
        self.batch_delete(&[user_id.to_string()], collections::LEADERBOARD)
            .await?;
        self.batch_delete(&[user_id.to_string()], collections::PROFILES)
            .await?;
        deleted_count += 2;
        tracing::debug!(user_id, "Deleted profile and leaderboard row");

        tracing::info!(user_id, deleted_count, "User data deletion complete");

        Ok(deleted_count)
    }
}
