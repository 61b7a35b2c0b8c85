// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Green Tracker: personal and community carbon footprint tracking
//!
//! This crate provides the backend API for logging carbon-emitting and
//! carbon-saving activities, maintaining per-user running totals and a
//! ranked leaderboard, and building footprint reports.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use config::Config;
use db::Store;
use services::{
    ActivityRecorder, AggregateMaintainer, CertificateService, EstimatorClient, LeaderboardFeed,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub feed: LeaderboardFeed,
    pub aggregates: AggregateMaintainer,
    pub recorder: ActivityRecorder,
    pub certificates: CertificateService,
    pub estimator: EstimatorClient,
}

impl AppState {
    /// Wire services around a store.
    pub fn new(config: Config, store: Arc<dyn Store>, estimator: EstimatorClient) -> Self {
        let feed = LeaderboardFeed::new();
        let aggregates = AggregateMaintainer::new(store.clone(), feed.clone());
        let recorder = ActivityRecorder::new(store.clone(), aggregates.clone());
        let certificates = CertificateService::new(store.clone());

        Self {
            config,
            store,
            feed,
            aggregates,
            recorder,
            certificates,
            estimator,
        }
    }
}
