// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-user running totals and the deltas that maintain them.
//!
//! Totals are updated incrementally from activity mutations instead of being
//! re-summed from history, so dashboard and leaderboard reads stay O(1).
//! Each delta is clamped at zero when applied. A total that was floored can
//! therefore drift above the true sum of the remaining records if previously
//! deleted records are logged again; that is the accepted cost of the
//! incremental approach.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::ActivityRecord;

/// Aggregate totals for a user ("profile").
///
/// Stored at: `profiles/{user_id}`
///
/// Updated atomically with activity writes via store transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserAggregate {
    pub user_id: String,
    pub display_name: String,
    /// Lifetime kg CO₂e, never below zero
    #[serde(default)]
    pub total_carbon_footprint: f64,
    /// Lifetime green points, never below zero
    #[serde(default)]
    pub total_green_points: i64,
    #[serde(default = "default_show_on_leaderboard")]
    pub show_on_leaderboard: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_show_on_leaderboard() -> bool {
    true
}

/// Profile fields a user may edit. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub show_on_leaderboard: Option<bool>,
}

/// Signed change to a user's totals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateDelta {
    pub carbon: f64,
    pub points: i64,
}

/// Error applying a delta. The aggregate is left untouched.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DeltaError {
    #[error("carbon total would become non-finite")]
    NonFinite,
}

impl UserAggregate {
    /// Zero-baseline aggregate for a user seen for the first time.
    pub fn new(user_id: &str, display_name: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            total_carbon_footprint: 0.0,
            total_green_points: 0,
            show_on_leaderboard: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Aggregate backfilled from a user's existing history.
    pub fn backfilled(
        user_id: &str,
        display_name: &str,
        history: &[ActivityRecord],
        now: DateTime<Utc>,
    ) -> Self {
        let mut aggregate = Self::new(user_id, display_name, now);
        let carbon: f64 = history.iter().map(|r| r.carbon_amount).sum();
        let points = history
            .iter()
            .fold(0i64, |acc, r| acc.saturating_add(r.green_points_earned));
        aggregate.total_carbon_footprint = carbon.max(0.0);
        aggregate.total_green_points = points.max(0);
        aggregate
    }

    /// Apply a signed delta, clamping each total at zero.
    pub fn apply_delta(&mut self, delta: AggregateDelta, now: DateTime<Utc>) -> Result<(), DeltaError> {
        if !delta.carbon.is_finite() {
            return Err(DeltaError::NonFinite);
        }
        let carbon = (self.total_carbon_footprint + delta.carbon).max(0.0);
        if !carbon.is_finite() {
            return Err(DeltaError::NonFinite);
        }

        self.total_carbon_footprint = carbon;
        self.total_green_points = self.total_green_points.saturating_add(delta.points).max(0);
        self.updated_at = now;
        Ok(())
    }
}

/// A mutation of one activity record, carried to the aggregate maintainer.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityChange {
    Inserted(ActivityRecord),
    Updated {
        old: ActivityRecord,
        new: ActivityRecord,
    },
    Deleted(ActivityRecord),
}

impl ActivityChange {
    /// Owner of the record being changed.
    pub fn user_id(&self) -> &str {
        match self {
            ActivityChange::Inserted(record) | ActivityChange::Deleted(record) => &record.user_id,
            ActivityChange::Updated { new, .. } => &new.user_id,
        }
    }

    /// The change to apply to the owner's totals.
    pub fn delta(&self) -> AggregateDelta {
        match self {
            ActivityChange::Inserted(record) => AggregateDelta {
                carbon: record.carbon_amount,
                points: record.green_points_earned,
            },
            ActivityChange::Updated { old, new } => AggregateDelta {
                carbon: new.carbon_amount - old.carbon_amount,
                points: new.green_points_earned.saturating_sub(old.green_points_earned),
            },
            ActivityChange::Deleted(record) => AggregateDelta {
                carbon: -record.carbon_amount,
                points: record.green_points_earned.saturating_neg(),
            },
        }
    }
}
