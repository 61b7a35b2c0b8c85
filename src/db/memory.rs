// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store.
//!
//! All tables live behind a single lock. Mutations hold the write lock for
//! their whole duration, so a reader sees either none or all of a commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{newest_first, ActivityQueryCursor, Store};
use crate::error::AppError;
use crate::models::category::seed_categories;
use crate::models::{
    ActivityCategory, ActivityChange, ActivityRecord, AggregateDelta, Certificate,
    LeaderboardEntry, ProfileUpdate, UserAggregate,
};

/// Display name for users first seen through an activity write.
pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

#[derive(Default)]
struct Tables {
    categories: HashMap<String, ActivityCategory>,
    activities: HashMap<Uuid, ActivityRecord>,
    profiles: HashMap<String, UserAggregate>,
    leaderboard: HashMap<String, LeaderboardEntry>,
    certificates: HashMap<Uuid, Certificate>,
}

impl Tables {
    /// The single place aggregate totals change: lazily create the user's
    /// aggregate, apply the clamped delta and mirror it onto the leaderboard.
    ///
    /// Validates before writing; on error no table is modified.
    fn apply_delta(
        &mut self,
        user_id: &str,
        delta: AggregateDelta,
        now: DateTime<Utc>,
    ) -> Result<LeaderboardEntry, AppError> {
        let mut aggregate = self
            .profiles
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserAggregate::new(user_id, DEFAULT_DISPLAY_NAME, now));

        aggregate.apply_delta(delta, now)?;

        let entry = LeaderboardEntry::from(&aggregate);
        self.profiles.insert(user_id.to_string(), aggregate);
        self.leaderboard.insert(user_id.to_string(), entry.clone());
        Ok(entry)
    }

    /// Check that the stored state still matches what the change was built from.
    fn check_precondition(&self, change: &ActivityChange) -> Result<(), AppError> {
        match change {
            ActivityChange::Inserted(record) => {
                if self.activities.contains_key(&record.id) {
                    return Err(AppError::Conflict(format!(
                        "Activity {} already exists",
                        record.id
                    )));
                }
            }
            ActivityChange::Updated { old, .. } | ActivityChange::Deleted(old) => {
                match self.activities.get(&old.id) {
                    None => {
                        return Err(AppError::NotFound(format!("Activity {} not found", old.id)))
                    }
                    Some(current) if current != old => {
                        return Err(AppError::Conflict(format!(
                            "Activity {} was modified concurrently",
                            old.id
                        )))
                    }
                    Some(_) => {}
                }
            }
        }

        if let ActivityChange::Updated { old, new } = change {
            if old.id != new.id || old.user_id != new.user_id {
                return Err(AppError::Validation(
                    "Update cannot change activity identity or owner".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// In-process store seeded with the category catalog.
pub struct MemoryDb {
    tables: RwLock<Tables>,
}

impl Default for MemoryDb {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::with_categories(seed_categories())
    }

    pub fn with_categories(categories: Vec<ActivityCategory>) -> Self {
        let tables = Tables {
            categories: categories.into_iter().map(|c| (c.id.clone(), c)).collect(),
            ..Default::default()
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Insert a record without touching aggregates.
    ///
    /// Only for seeding history that predates a user's aggregate, as when
    /// records are imported before the user first signs in.
    pub async fn import_activity(&self, record: ActivityRecord) {
        self.tables
            .write()
            .await
            .activities
            .insert(record.id, record);
    }
}

#[async_trait]
impl Store for MemoryDb {
    async fn list_categories(&self) -> Result<Vec<ActivityCategory>, AppError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<ActivityCategory> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, category_id: &str) -> Result<Option<ActivityCategory>, AppError> {
        Ok(self.tables.read().await.categories.get(category_id).cloned())
    }

    async fn get_activity(&self, activity_id: Uuid) -> Result<Option<ActivityRecord>, AppError> {
        Ok(self.tables.read().await.activities.get(&activity_id).cloned())
    }

    async fn list_activities_for_user(
        &self,
        user_id: &str,
        cursor: Option<ActivityQueryCursor>,
        limit: Option<u32>,
    ) -> Result<Vec<ActivityRecord>, AppError> {
        let tables = self.tables.read().await;
        let mut records: Vec<ActivityRecord> = tables
            .activities
            .values()
            .filter(|r| r.user_id == user_id)
            .filter(|r| cursor.map_or(true, |c| c.is_before(r)))
            .cloned()
            .collect();

        records.sort_by(newest_first);
        if let Some(limit) = limit {
            records.truncate(limit as usize);
        }
        Ok(records)
    }

    async fn commit_activity_change(
        &self,
        change: &ActivityChange,
        now: DateTime<Utc>,
    ) -> Result<LeaderboardEntry, AppError> {
        let mut tables = self.tables.write().await;

        tables.check_precondition(change)?;
        // Aggregate first: it is the only step that can fail after the
        // precondition, and it leaves the tables untouched when it does.
        let entry = tables.apply_delta(change.user_id(), change.delta(), now)?;

        match change {
            ActivityChange::Inserted(record) | ActivityChange::Updated { new: record, .. } => {
                tables.activities.insert(record.id, record.clone());
            }
            ActivityChange::Deleted(record) => {
                tables.activities.remove(&record.id);
            }
        }

        tracing::info!(
            user_id = %entry.user_id,
            total_carbon = entry.total_carbon_footprint,
            total_points = entry.total_green_points,
            "Activity change committed"
        );

        Ok(entry)
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserAggregate>, AppError> {
        Ok(self.tables.read().await.profiles.get(user_id).cloned())
    }

    async fn ensure_profile(
        &self,
        user_id: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(UserAggregate, Option<LeaderboardEntry>), AppError> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables.profiles.get(user_id) {
            return Ok((existing.clone(), None));
        }

        let history: Vec<ActivityRecord> = tables
            .activities
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        let aggregate = UserAggregate::backfilled(user_id, display_name, &history, now);
        let entry = LeaderboardEntry::from(&aggregate);

        tables
            .profiles
            .insert(user_id.to_string(), aggregate.clone());
        tables.leaderboard.insert(user_id.to_string(), entry.clone());

        tracing::info!(
            user_id,
            backfilled = history.len(),
            "Created user aggregate"
        );

        Ok((aggregate, Some(entry)))
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<(UserAggregate, LeaderboardEntry), AppError> {
        let mut tables = self.tables.write().await;

        let mut aggregate = tables
            .profiles
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserAggregate::new(user_id, DEFAULT_DISPLAY_NAME, now));

        if let Some(name) = &update.display_name {
            aggregate.display_name = name.clone();
        }
        if let Some(show) = update.show_on_leaderboard {
            aggregate.show_on_leaderboard = show;
        }
        aggregate.updated_at = now;

        let entry = LeaderboardEntry::from(&aggregate);
        tables
            .profiles
            .insert(user_id.to_string(), aggregate.clone());
        tables.leaderboard.insert(user_id.to_string(), entry.clone());

        Ok((aggregate, entry))
    }

    async fn leaderboard_entries(&self) -> Result<Vec<LeaderboardEntry>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .leaderboard
            .values()
            .filter(|e| e.visible)
            .cloned()
            .collect())
    }

    async fn save_certificate(&self, certificate: &Certificate) -> Result<(), AppError> {
        self.tables
            .write()
            .await
            .certificates
            .insert(certificate.id, certificate.clone());
        Ok(())
    }

    async fn list_certificates(&self, user_id: &str) -> Result<Vec<Certificate>, AppError> {
        let tables = self.tables.read().await;
        let mut certificates: Vec<Certificate> = tables
            .certificates
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        certificates.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(certificates)
    }

    async fn delete_user_data(&self, user_id: &str) -> Result<usize, AppError> {
        let mut tables = self.tables.write().await;

        let before = tables.activities.len() + tables.certificates.len();
        tables.activities.retain(|_, r| r.user_id != user_id);
        tables.certificates.retain(|_, c| c.user_id != user_id);
        let mut deleted = before - tables.activities.len() - tables.certificates.len();

        if tables.profiles.remove(user_id).is_some() {
            deleted += 1;
        }
        if tables.leaderboard.remove(user_id).is_some() {
            deleted += 1;
        }

        tracing::info!(user_id, deleted, "User data deletion complete");
        Ok(deleted)
    }
}
