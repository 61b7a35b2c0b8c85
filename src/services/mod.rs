// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod aggregate;
pub mod certificate;
pub mod estimator;
pub mod export;
pub mod feed;
pub mod leaderboard;
pub mod report;

pub use activity::ActivityRecorder;
pub use aggregate::AggregateMaintainer;
pub use certificate::CertificateService;
pub use estimator::{EmissionEstimate, EstimatorClient, EstimatorError};
pub use feed::{LeaderboardEvent, LeaderboardFeed};
