// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! The `Store` trait is the persistence seam. Every activity mutation goes
//! through [`Store::commit_activity_change`], which writes the record, the
//! owner's aggregate and the owner's leaderboard row as one transaction.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    ActivityCategory, ActivityChange, ActivityRecord, Certificate, LeaderboardEntry,
    ProfileUpdate, UserAggregate,
};

/// Collection names as constants.
pub mod collections {
    pub const CATEGORIES: &str = "categories";
    pub const ACTIVITIES: &str = "activities";
    /// User aggregates (keyed by user_id)
    pub const PROFILES: &str = "profiles";
    /// Denormalized leaderboard rows (keyed by user_id)
    pub const LEADERBOARD: &str = "leaderboard";
    pub const CERTIFICATES: &str = "certificates";
}

/// Position in a user's newest-first activity history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityQueryCursor {
    pub logged_at: DateTime<Utc>,
    pub activity_id: Uuid,
}

impl ActivityQueryCursor {
    /// Whether `record` sorts strictly after this cursor (newest first, then id).
    pub fn is_before(&self, record: &ActivityRecord) -> bool {
        record.logged_at < self.logged_at
            || (record.logged_at == self.logged_at && record.id < self.activity_id)
    }
}

/// Newest-first ordering used for activity listings.
pub fn newest_first(a: &ActivityRecord, b: &ActivityRecord) -> std::cmp::Ordering {
    b.logged_at.cmp(&a.logged_at).then_with(|| b.id.cmp(&a.id))
}

/// Persistent store operations.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Categories ──────────────────────────────────────────────

    async fn list_categories(&self) -> Result<Vec<ActivityCategory>, AppError>;

    async fn get_category(&self, category_id: &str) -> Result<Option<ActivityCategory>, AppError>;

    // ─── Activities ──────────────────────────────────────────────

    async fn get_activity(&self, activity_id: Uuid) -> Result<Option<ActivityRecord>, AppError>;

    /// A user's activities, newest first. `limit = None` returns everything.
    async fn list_activities_for_user(
        &self,
        user_id: &str,
        cursor: Option<ActivityQueryCursor>,
        limit: Option<u32>,
    ) -> Result<Vec<ActivityRecord>, AppError>;

    /// Atomically apply an activity mutation, the owner's aggregate delta and
    /// the leaderboard upsert. Returns the rewritten leaderboard row.
    ///
    /// Fails with `Conflict` if the stored record no longer matches the
    /// change's precondition; nothing is written in that case.
    async fn commit_activity_change(
        &self,
        change: &ActivityChange,
        now: DateTime<Utc>,
    ) -> Result<LeaderboardEntry, AppError>;

    // ─── Profiles ────────────────────────────────────────────────

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserAggregate>, AppError>;

    /// Return the user's aggregate, creating it (backfilled from existing
    /// history) if this is the first time the user is seen. The leaderboard
    /// row is returned when one was created.
    async fn ensure_profile(
        &self,
        user_id: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(UserAggregate, Option<LeaderboardEntry>), AppError>;

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<(UserAggregate, LeaderboardEntry), AppError>;

    // ─── Leaderboard ─────────────────────────────────────────────

    /// All leaderboard rows whose owner opted in.
    async fn leaderboard_entries(&self) -> Result<Vec<LeaderboardEntry>, AppError>;

    // ─── Certificates ────────────────────────────────────────────

    async fn save_certificate(&self, certificate: &Certificate) -> Result<(), AppError>;

    /// A user's certificates, newest first.
    async fn list_certificates(&self, user_id: &str) -> Result<Vec<Certificate>, AppError>;

    // ─── User Data Deletion ──────────────────────────────────────

    /// Delete everything owned by a user. Returns the number of rows removed.
    async fn delete_user_data(&self, user_id: &str) -> Result<usize, AppError>;
}
