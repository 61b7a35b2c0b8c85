// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Aggregate maintenance.
//!
//! Every activity mutation is turned into an [`ActivityChange`] and handed
//! here exactly once. The store commits the record, the clamped aggregate
//! delta and the leaderboard row together; the new row is then pushed to
//! the realtime feed.

use chrono::Utc;
use std::sync::Arc;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{ActivityChange, LeaderboardEntry, ProfileUpdate, UserAggregate};
use crate::services::feed::LeaderboardFeed;

/// Longest accepted display name, in characters.
pub const MAX_DISPLAY_NAME_LEN: usize = 50;

#[derive(Clone)]
pub struct AggregateMaintainer {
    store: Arc<dyn Store>,
    feed: LeaderboardFeed,
}

impl AggregateMaintainer {
    pub fn new(store: Arc<dyn Store>, feed: LeaderboardFeed) -> Self {
        Self { store, feed }
    }

    /// Commit an activity change with its aggregate delta.
    ///
    /// On error nothing was written and nothing is published.
    pub async fn apply(&self, change: &ActivityChange) -> Result<LeaderboardEntry> {
        let delta = change.delta();
        tracing::debug!(
            user_id = change.user_id(),
            carbon_delta = delta.carbon,
            points_delta = delta.points,
            "Applying aggregate delta"
        );

        let entry = self
            .store
            .commit_activity_change(change, Utc::now())
            .await?;
        self.feed.publish(entry.clone());
        Ok(entry)
    }

    /// Return the user's aggregate, creating and backfilling it on first sight.
    pub async fn ensure_profile(&self, user_id: &str, display_name: &str) -> Result<UserAggregate> {
        let (aggregate, created) = self
            .store
            .ensure_profile(user_id, display_name, Utc::now())
            .await?;
        if let Some(entry) = created {
            self.feed.publish(entry);
        }
        Ok(aggregate)
    }

    /// Update profile settings and re-mirror the leaderboard row.
    pub async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<UserAggregate> {
        let update = normalize_profile_update(update)?;
        let (aggregate, entry) = self
            .store
            .update_profile(user_id, &update, Utc::now())
            .await?;
        self.feed.publish(entry);
        Ok(aggregate)
    }

    /// Delete all of a user's data and drop them from the live board.
    pub async fn delete_user(&self, user_id: &str) -> Result<usize> {
        let deleted = self.store.delete_user_data(user_id).await?;
        self.feed.publish_removal(user_id);
        Ok(deleted)
    }
}

fn normalize_profile_update(update: &ProfileUpdate) -> Result<ProfileUpdate> {
    if update.display_name.is_none() && update.show_on_leaderboard.is_none() {
        return Err(AppError::Validation("No profile fields to update".to_string()));
    }

    let display_name = match update.display_name.as_deref().map(str::trim) {
        Some("") => {
            return Err(AppError::Validation(
                "Display name must not be empty".to_string(),
            ))
        }
        Some(name) if name.chars().count() > MAX_DISPLAY_NAME_LEN => {
            return Err(AppError::Validation(format!(
                "Display name must be at most {} characters",
                MAX_DISPLAY_NAME_LEN
            )))
        }
        Some(name) => Some(name.to_string()),
        None => None,
    };

    Ok(ProfileUpdate {
        display_name,
        show_on_leaderboard: update.show_on_leaderboard,
    })
}
