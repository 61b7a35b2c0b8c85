// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Cosmetic sustainability certificate.
//!
//! The token and transaction identifiers are random hex strings. No chain or
//! ledger backs them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Certificate {
    pub id: Uuid,
    pub user_id: String,
    /// `0x` + 32 hex chars
    pub token_id: String,
    /// `0x` + 64 hex chars
    pub tx_hash: String,
    /// Totals at the time of minting
    pub total_carbon_footprint: f64,
    pub total_green_points: i64,
    pub issued_at: DateTime<Utc>,
}
