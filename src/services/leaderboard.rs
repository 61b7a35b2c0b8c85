// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard reads.

use crate::db::Store;
use crate::error::Result;
use crate::models::leaderboard::rank_entries;
use crate::models::RankedEntry;

/// Top `limit` opted-in users, lowest footprint first.
pub async fn get_leaderboard(store: &dyn Store, limit: usize) -> Result<Vec<RankedEntry>> {
    let entries = store.leaderboard_entries().await?;
    tracing::debug!(candidates = entries.len(), limit, "Ranking leaderboard");
    Ok(rank_entries(entries, limit))
}
