// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity recording service.
//!
//! Handles the core workflow:
//! 1. Validate the request
//! 2. Look up the category and compute carbon amount and points
//! 3. Commit the record together with the owner's aggregate delta
//! 4. Publish the owner's new leaderboard row

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{
    ActivityCategory, ActivityChange, ActivityRecord, ActivityUpdate, NewActivity,
};
use crate::services::aggregate::AggregateMaintainer;

/// Longest accepted activity description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Largest carbon magnitude (kg CO₂e) a single activity may carry.
pub const MAX_ACTIVITY_CARBON_KG: f64 = 1.0e9;

/// How far in the future `logged_at` may be (client clock skew).
const MAX_FUTURE_SKEW_HOURS: i64 = 24;

/// Validates, persists, edits and removes activity records.
#[derive(Clone)]
pub struct ActivityRecorder {
    store: Arc<dyn Store>,
    aggregates: AggregateMaintainer,
}

impl ActivityRecorder {
    pub fn new(store: Arc<dyn Store>, aggregates: AggregateMaintainer) -> Self {
        Self { store, aggregates }
    }

    /// Log a new activity for a user.
    pub async fn log_activity(&self, user_id: &str, request: NewActivity) -> Result<ActivityRecord> {
        let quantity = validate_quantity(request.quantity)?;
        let description = validate_description(request.description.as_deref())?;
        let now = Utc::now();
        let logged_at = validate_logged_at(request.logged_at, now)?;
        let category = self.load_category(request.category_id.as_deref()).await?;

        let (carbon_amount, green_points_earned) = compute_amounts(&category, quantity)?;
        let record = ActivityRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            category_id: category.id.clone(),
            description,
            quantity,
            carbon_amount,
            green_points_earned,
            logged_at,
        };

        self.aggregates
            .apply(&ActivityChange::Inserted(record.clone()))
            .await?;

        tracing::info!(
            user_id,
            activity_id = %record.id,
            category = %record.category_id,
            carbon_amount = record.carbon_amount,
            points = record.green_points_earned,
            "Activity logged"
        );

        Ok(record)
    }

    /// Edit one of the user's activities.
    ///
    /// Carbon amount and points are recomputed from the (possibly new)
    /// category and quantity.
    pub async fn update_activity(
        &self,
        user_id: &str,
        activity_id: Uuid,
        update: ActivityUpdate,
    ) -> Result<ActivityRecord> {
        if update.is_empty() {
            return Err(AppError::Validation("No fields to update".to_string()));
        }

        let old = self.load_owned(user_id, activity_id).await?;

        let quantity = match update.quantity {
            Some(q) => validate_quantity(Some(q))?,
            None => old.quantity,
        };
        let description = match update.description.as_deref() {
            Some(d) => validate_description(Some(d))?,
            None => old.description.clone(),
        };
        let logged_at = match update.logged_at {
            Some(at) => validate_logged_at(Some(at), Utc::now())?,
            None => old.logged_at,
        };
        let category_id = update.category_id.as_deref().unwrap_or(&old.category_id);
        let category = self.load_category(Some(category_id)).await?;

        let (carbon_amount, green_points_earned) = compute_amounts(&category, quantity)?;
        let new = ActivityRecord {
            id: old.id,
            user_id: old.user_id.clone(),
            category_id: category.id.clone(),
            description,
            quantity,
            carbon_amount,
            green_points_earned,
            logged_at,
        };

        self.aggregates
            .apply(&ActivityChange::Updated {
                old,
                new: new.clone(),
            })
            .await?;

        tracing::info!(user_id, activity_id = %activity_id, "Activity updated");
        Ok(new)
    }

    /// Remove one of the user's activities.
    pub async fn delete_activity(&self, user_id: &str, activity_id: Uuid) -> Result<ActivityRecord> {
        let record = self.load_owned(user_id, activity_id).await?;

        self.aggregates
            .apply(&ActivityChange::Deleted(record.clone()))
            .await?;

        tracing::info!(user_id, activity_id = %activity_id, "Activity deleted");
        Ok(record)
    }

    async fn load_category(&self, category_id: Option<&str>) -> Result<ActivityCategory> {
        let category_id = category_id.unwrap_or("").trim();
        if category_id.is_empty() {
            return Err(AppError::Validation("category_id is required".to_string()));
        }

        self.store
            .get_category(category_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", category_id)))
    }

    /// Records owned by someone else look exactly like missing ones.
    async fn load_owned(&self, user_id: &str, activity_id: Uuid) -> Result<ActivityRecord> {
        self.store
            .get_activity(activity_id)
            .await?
            .filter(|r| r.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", activity_id)))
    }
}

fn validate_quantity(quantity: Option<f64>) -> Result<f64> {
    match quantity {
        None => Err(AppError::Validation("quantity is required".to_string())),
        Some(q) if !q.is_finite() || q <= 0.0 => Err(AppError::Validation(
            "quantity must be a positive number".to_string(),
        )),
        Some(q) => Ok(q),
    }
}

/// Carbon amount and points for `quantity` of `category`.
fn compute_amounts(category: &ActivityCategory, quantity: f64) -> Result<(f64, i64)> {
    let carbon_amount = category.carbon_for(quantity);
    if !carbon_amount.is_finite() || carbon_amount.abs() > MAX_ACTIVITY_CARBON_KG {
        return Err(AppError::Validation(format!(
            "quantity too large: carbon amount must be within {} kg",
            MAX_ACTIVITY_CARBON_KG
        )));
    }
    Ok((carbon_amount, category.points_for(carbon_amount)))
}

fn validate_description(description: Option<&str>) -> Result<String> {
    let description = description.unwrap_or("").trim();
    if description.is_empty() {
        return Err(AppError::Validation("description is required".to_string()));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!(
            "description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(description.to_string())
}

fn validate_logged_at(logged_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match logged_at {
        None => Ok(now),
        Some(at) if at > now + Duration::hours(MAX_FUTURE_SKEW_HOURS) => Err(AppError::Validation(
            "logged_at cannot be in the future".to_string(),
        )),
        Some(at) => Ok(at),
    }
}
