// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Logged activity model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Stored activity record.
///
/// `carbon_amount` and `green_points_earned` are computed when the record is
/// written and stored; they are not recomputed if the category changes later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityRecord {
    /// Activity ID (also used as document ID)
    pub id: Uuid,
    /// Owning user
    pub user_id: String,
    /// Category slug
    pub category_id: String,
    /// Free-text description
    pub description: String,
    /// Quantity in the category's unit
    pub quantity: f64,
    /// kg CO₂e, `quantity * emission_factor` (may be negative)
    pub carbon_amount: f64,
    /// Reward for this activity (non-negative)
    pub green_points_earned: i64,
    /// When the activity happened
    pub logged_at: DateTime<Utc>,
}

/// Request body for logging an activity.
#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logged_at: Option<DateTime<Utc>>,
}

/// Request body for editing an activity. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityUpdate {
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logged_at: Option<DateTime<Utc>>,
}

impl ActivityUpdate {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.quantity.is_none()
            && self.description.is_none()
            && self.logged_at.is_none()
    }
}
