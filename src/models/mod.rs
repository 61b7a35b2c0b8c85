// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod aggregate;
pub mod category;
pub mod certificate;
pub mod leaderboard;

pub use activity::{ActivityRecord, ActivityUpdate, NewActivity};
pub use aggregate::{ActivityChange, AggregateDelta, DeltaError, ProfileUpdate, UserAggregate};
pub use category::{ActivityCategory, CategoryKind};
pub use certificate::Certificate;
pub use leaderboard::{LeaderboardEntry, RankedEntry};
