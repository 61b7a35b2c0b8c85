// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Realtime leaderboard change feed.
//!
//! Rows are published only after the transaction that wrote them has
//! committed. Subscribers that fall behind lose the oldest events.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::LeaderboardEntry;

const FEED_CAPACITY: usize = 256;

/// One change pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LeaderboardEvent {
    /// Row is visible with these totals.
    Upsert(LeaderboardEntry),
    /// Row left the public board (opt-out or account deletion).
    Remove { user_id: String },
}

impl From<LeaderboardEntry> for LeaderboardEvent {
    fn from(entry: LeaderboardEntry) -> Self {
        if entry.visible {
            LeaderboardEvent::Upsert(entry)
        } else {
            LeaderboardEvent::Remove {
                user_id: entry.user_id,
            }
        }
    }
}

/// Broadcast channel for leaderboard changes.
#[derive(Clone)]
pub struct LeaderboardFeed {
    sender: broadcast::Sender<LeaderboardEvent>,
}

impl Default for LeaderboardFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaderboardFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    /// Publish a rewritten leaderboard row.
    pub fn publish(&self, entry: LeaderboardEntry) {
        self.send(entry.into());
    }

    /// Publish removal of a user's row.
    pub fn publish_removal(&self, user_id: &str) {
        self.send(LeaderboardEvent::Remove {
            user_id: user_id.to_string(),
        });
    }

    fn send(&self, event: LeaderboardEvent) {
        // Err only means nobody is listening.
        let receivers = self.sender.send(event).unwrap_or(0);
        tracing::debug!(receivers, "Published leaderboard event");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LeaderboardEvent> {
        self.sender.subscribe()
    }
}
