// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Leaderboard projection.
//!
//! Rows are a denormalized copy of each user's aggregate, rewritten in the
//! same transaction as the aggregate. Ranks are never stored; they are
//! assigned positionally whenever the board is read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::UserAggregate;

/// Stored leaderboard row, keyed by user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub display_name: String,
    pub total_carbon_footprint: f64,
    pub total_green_points: i64,
    /// Mirror of the owner's `show_on_leaderboard`
    pub visible: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserAggregate> for LeaderboardEntry {
    fn from(aggregate: &UserAggregate) -> Self {
        Self {
            user_id: aggregate.user_id.clone(),
            display_name: aggregate.display_name.clone(),
            total_carbon_footprint: aggregate.total_carbon_footprint,
            total_green_points: aggregate.total_green_points,
            visible: aggregate.show_on_leaderboard,
            updated_at: aggregate.updated_at,
        }
    }
}

/// Leaderboard row with its position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RankedEntry {
    /// 1-based
    pub rank: u32,
    pub user_id: String,
    pub display_name: String,
    pub total_carbon_footprint: f64,
    pub total_green_points: i64,
}

/// Rank visible rows by ascending footprint and keep the first `limit`.
///
/// Ties are broken by user ID so the order is stable across reads.
pub fn rank_entries(entries: Vec<LeaderboardEntry>, limit: usize) -> Vec<RankedEntry> {
    let mut visible: Vec<LeaderboardEntry> = entries.into_iter().filter(|e| e.visible).collect();

    visible.sort_by(|a, b| {
        a.total_carbon_footprint
            .total_cmp(&b.total_carbon_footprint)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });

    visible
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, e)| RankedEntry {
            rank: i as u32 + 1,
            user_id: e.user_id,
            display_name: e.display_name,
            total_carbon_footprint: e.total_carbon_footprint,
            total_green_points: e.total_green_points,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user_id: &str, carbon: f64, visible: bool) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id: user_id.to_string(),
            display_name: user_id.to_uppercase(),
            total_carbon_footprint: carbon,
            total_green_points: 0,
            visible,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_ranks_ascending_by_footprint() {
        let ranked = rank_entries(
            vec![entry("a", 30.0, true), entry("b", 5.0, true), entry("c", 12.5, true)],
            10,
        );

        let order: Vec<(&str, u32)> = ranked.iter().map(|e| (e.user_id.as_str(), e.rank)).collect();
        assert_eq!(order, vec![("b", 1), ("c", 2), ("a", 3)]);
    }

    #[test]
    fn test_hidden_users_excluded() {
        let ranked = rank_entries(vec![entry("a", 1.0, false), entry("b", 2.0, true)], 10);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].user_id, "b");
        assert_eq!(ranked[0].rank, 1);
    }

    #[test]
    fn test_limit_and_stable_ties() {
        let ranked = rank_entries(
            vec![
                entry("z", 0.0, true),
                entry("m", 0.0, true),
                entry("a", 0.0, true),
                entry("q", 9.0, true),
            ],
            2,
        );

        let ids: Vec<&str> = ranked.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "m"]);
    }
}
