// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public routes: category catalog and leaderboard.

use crate::config::MAX_LEADERBOARD_LIMIT;
use crate::error::{AppError, Result};
use crate::models::{ActivityCategory, RankedEntry};
use crate::services::leaderboard::get_leaderboard;
use crate::services::LeaderboardEvent;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/categories", get(list_categories))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/leaderboard/stream", get(leaderboard_stream))
}

// ─── Categories ──────────────────────────────────────────────

async fn list_categories(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ActivityCategory>>> {
    Ok(Json(state.store.list_categories().await?))
}

// ─── Leaderboard ─────────────────────────────────────────────

#[derive(Deserialize)]
struct LeaderboardQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardResponse {
    pub entries: Vec<RankedEntry>,
}

fn resolve_limit(requested: Option<usize>, default: usize) -> Result<usize> {
    match requested {
        None => Ok(default),
        Some(0) => Err(AppError::Validation(
            "limit must be greater than 0".to_string(),
        )),
        Some(n) => Ok(n.min(MAX_LEADERBOARD_LIMIT)),
    }
}

/// Opted-in users ranked by ascending lifetime footprint.
async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>> {
    let limit = resolve_limit(params.limit, state.config.leaderboard_default_limit)?;
    let entries = get_leaderboard(state.store.as_ref(), limit).await?;
    Ok(Json(LeaderboardResponse { entries }))
}

fn to_sse(event: &LeaderboardEvent) -> std::result::Result<Event, axum::Error> {
    match event {
        LeaderboardEvent::Upsert(entry) => Event::default().event("upsert").json_data(entry),
        LeaderboardEvent::Remove { user_id } => Event::default()
            .event("remove")
            .json_data(serde_json::json!({ "user_id": user_id })),
    }
}

/// Server-sent stream of leaderboard row changes.
async fn leaderboard_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    let rx = state.feed.subscribe();
    tracing::debug!("Leaderboard subscriber connected");

    let events = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((to_sse(&event), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Leaderboard subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
