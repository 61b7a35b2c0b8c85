// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Footprint reports.
//!
//! Reports are recomputed from the user's full activity history on every
//! request rather than read from the running aggregates, so they reflect the
//! true sums even where the clamped totals have drifted. History is loaded
//! unpaginated.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::Store;
use crate::error::Result;
use crate::models::{ActivityCategory, ActivityRecord};

/// Fixed divisor for the average daily figure, regardless of month length.
pub const DAYS_PER_MONTH: f64 = 30.0;

const UNKNOWN_CATEGORY: &str = "Unknown";

/// Totals for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MonthlySummary {
    /// "YYYY-MM"
    pub month: String,
    pub total_emissions: f64,
    pub activity_count: u32,
    pub points_earned: i64,
    pub avg_daily_emissions: f64,
}

impl MonthlySummary {
    fn empty(month: String) -> Self {
        Self {
            month,
            total_emissions: 0.0,
            activity_count: 0,
            points_earned: 0,
            avg_daily_emissions: 0.0,
        }
    }

    fn add(&mut self, record: &ActivityRecord) {
        self.total_emissions += record.carbon_amount;
        self.activity_count += 1;
        self.points_earned = self.points_earned.saturating_add(record.green_points_earned);
        self.avg_daily_emissions = self.total_emissions / DAYS_PER_MONTH;
    }
}

/// Emissions attributed to one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CategoryBreakdown {
    pub category: String,
    pub total_emissions: f64,
    pub activity_count: u32,
    /// Share of the grand total; 0 when the grand total is 0
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Report {
    /// Oldest month first
    pub monthly: Vec<MonthlySummary>,
    /// Largest total first
    pub by_category: Vec<CategoryBreakdown>,
    pub current_month: MonthlySummary,
    /// Month with the lowest total emissions
    pub best_month: Option<String>,
    /// Month with the highest total emissions
    pub worst_month: Option<String>,
    pub total_emissions: f64,
    pub total_points: i64,
    pub activity_count: u32,
}

/// "YYYY-MM" for a timestamp.
pub fn month_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

/// Build a report from a user's history.
pub fn build_report(
    records: &[ActivityRecord],
    categories: &[ActivityCategory],
    now: DateTime<Utc>,
) -> Report {
    let names: HashMap<&str, &str> = categories
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();

    let mut months: BTreeMap<String, MonthlySummary> = BTreeMap::new();
    let mut by_category: HashMap<&str, (f64, u32)> = HashMap::new();

    for record in records {
        let key = month_key(record.logged_at);
        months
            .entry(key.clone())
            .or_insert_with(|| MonthlySummary::empty(key))
            .add(record);

        let name = names
            .get(record.category_id.as_str())
            .copied()
            .unwrap_or(UNKNOWN_CATEGORY);
        let slot = by_category.entry(name).or_insert((0.0, 0));
        slot.0 += record.carbon_amount;
        slot.1 += 1;
    }

    let total_emissions: f64 = records.iter().map(|r| r.carbon_amount).sum();
    let total_points = records
        .iter()
        .fold(0i64, |acc, r| acc.saturating_add(r.green_points_earned));

    let mut breakdown: Vec<CategoryBreakdown> = by_category
        .into_iter()
        .map(|(name, (total, count))| CategoryBreakdown {
            category: name.to_string(),
            total_emissions: total,
            activity_count: count,
            percentage: if total_emissions != 0.0 {
                total / total_emissions * 100.0
            } else {
                0.0
            },
        })
        .collect();
    breakdown.sort_by(|a, b| {
        b.total_emissions
            .total_cmp(&a.total_emissions)
            .then_with(|| a.category.cmp(&b.category))
    });

    let monthly: Vec<MonthlySummary> = months.into_values().collect();

    // Ties resolve to the earliest month for both.
    let best_month = monthly
        .iter()
        .fold(None::<&MonthlySummary>, |best, m| match best {
            Some(b) if b.total_emissions <= m.total_emissions => Some(b),
            _ => Some(m),
        })
        .map(|m| m.month.clone());
    let worst_month = monthly
        .iter()
        .fold(None::<&MonthlySummary>, |worst, m| match worst {
            Some(w) if w.total_emissions >= m.total_emissions => Some(w),
            _ => Some(m),
        })
        .map(|m| m.month.clone());

    let current_key = month_key(now);
    let current_month = monthly
        .iter()
        .find(|m| m.month == current_key)
        .cloned()
        .unwrap_or_else(|| MonthlySummary::empty(current_key));

    Report {
        monthly,
        by_category: breakdown,
        current_month,
        best_month,
        worst_month,
        total_emissions,
        total_points,
        activity_count: records.len() as u32,
    }
}

/// Load a user's full history and build their report.
pub async fn build_user_report(store: &dyn Store, user_id: &str, now: DateTime<Utc>) -> Result<Report> {
    let records = store.list_activities_for_user(user_id, None, None).await?;
    let categories = store.list_categories().await?;

    tracing::debug!(user_id, records = records.len(), "Building report");
    Ok(build_report(&records, &categories, now))
}
