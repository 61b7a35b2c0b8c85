// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::db::ActivityQueryCursor;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    ActivityRecord, ActivityUpdate, Certificate, NewActivity, ProfileUpdate, UserAggregate,
};
use crate::services::estimator::MAX_ESTIMATE_DESCRIPTION_LEN;
use crate::services::export::activities_to_csv;
use crate::services::report::{build_user_report, Report};
use crate::services::EmissionEstimate;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 100;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).put(update_me).delete(delete_account))
        .route("/api/activities", get(get_activities).post(create_activity))
        .route("/api/activities/export", get(export_activities))
        .route(
            "/api/activities/{id}",
            put(update_activity).delete(delete_activity),
        )
        .route("/api/reports", get(get_report))
        .route("/api/estimate", post(estimate))
        .route(
            "/api/certificates",
            get(list_certificates).post(mint_certificate),
        )
}

// ─── User Profile ────────────────────────────────────────────

/// Current user's profile and running totals.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserAggregate>> {
    let aggregate = state
        .aggregates
        .ensure_profile(&user.user_id, &user.default_display_name())
        .await?;
    Ok(Json(aggregate))
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserAggregate>> {
    // Backfill first so a brand new profile starts from its history.
    state
        .aggregates
        .ensure_profile(&user.user_id, &user.default_display_name())
        .await?;
    let aggregate = state.aggregates.update_profile(&user.user_id, &update).await?;
    Ok(Json(aggregate))
}

// ─── Account Deletion ────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub documents_deleted: usize,
}

/// Delete the user's profile, history, leaderboard row and certificates.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DeleteAccountResponse>> {
    tracing::info!(user_id = %user.user_id, "User-initiated account deletion");

    let documents_deleted = state.aggregates.delete_user(&user.user_id).await?;

    Ok(Json(DeleteAccountResponse {
        success: true,
        documents_deleted,
    }))
}

// ─── Activities ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ActivitiesQuery {
    /// Cursor for forward pagination (opaque token).
    cursor: Option<String>,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn parse_cursor(cursor: Option<&str>) -> Result<Option<ActivityQueryCursor>> {
    cursor
        .map(|raw| {
            let invalid_cursor = || AppError::Validation("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;
            let parts: Vec<&str> = decoded_str.splitn(3, ':').collect();

            if parts.len() != 3 {
                return Err(invalid_cursor());
            }

            let seconds = parts[0].parse::<i64>().map_err(|_| invalid_cursor())?;
            let nanos = parts[1].parse::<u32>().map_err(|_| invalid_cursor())?;
            let activity_id = parts[2].parse::<Uuid>().map_err(|_| invalid_cursor())?;
            let logged_at =
                chrono::DateTime::from_timestamp(seconds, nanos).ok_or_else(invalid_cursor)?;

            Ok(ActivityQueryCursor {
                logged_at,
                activity_id,
            })
        })
        .transpose()
}

fn encode_cursor(cursor: ActivityQueryCursor) -> String {
    let payload = format!(
        "{}:{}:{}",
        cursor.logged_at.timestamp(),
        cursor.logged_at.timestamp_subsec_nanos(),
        cursor.activity_id
    );
    URL_SAFE_NO_PAD.encode(payload)
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivityRecord>,
    pub per_page: u32,
    pub next_cursor: Option<String>,
}

/// Page through the user's history, newest first.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    if params.per_page == 0 {
        return Err(AppError::Validation(
            "'per_page' must be greater than 0".to_string(),
        ));
    }
    let per_page = params.per_page.min(MAX_PER_PAGE);
    let cursor = parse_cursor(params.cursor.as_deref())?;

    tracing::debug!(
        user_id = %user.user_id,
        cursor = ?params.cursor,
        per_page,
        "Fetching activities"
    );

    // Fetch one extra to learn whether another page exists.
    let mut activities = state
        .store
        .list_activities_for_user(&user.user_id, cursor, Some(per_page + 1))
        .await?;

    let has_more = activities.len() > per_page as usize;
    activities.truncate(per_page as usize);

    let next_cursor = if has_more {
        activities.last().map(|last| {
            encode_cursor(ActivityQueryCursor {
                logged_at: last.logged_at,
                activity_id: last.id,
            })
        })
    } else {
        None
    };

    Ok(Json(ActivitiesResponse {
        activities,
        per_page,
        next_cursor,
    }))
}

async fn create_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<NewActivity>,
) -> Result<(StatusCode, Json<ActivityRecord>)> {
    let record = state.recorder.log_activity(&user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<Uuid>,
    Json(update): Json<ActivityUpdate>,
) -> Result<Json<ActivityRecord>> {
    let record = state
        .recorder
        .update_activity(&user.user_id, activity_id, update)
        .await?;
    Ok(Json(record))
}

async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<Uuid>,
) -> Result<StatusCode> {
    state
        .recorder
        .delete_activity(&user.user_id, activity_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Full history as a CSV download.
async fn export_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let records = state
        .store
        .list_activities_for_user(&user.user_id, None, None)
        .await?;
    let categories = state.store.list_categories().await?;
    let csv = activities_to_csv(&records, &categories);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"activities.csv\"",
            ),
        ],
        csv,
    ))
}

// ─── Reports ─────────────────────────────────────────────────

async fn get_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Report>> {
    let report = build_user_report(state.store.as_ref(), &user.user_id, Utc::now()).await?;
    Ok(Json(report))
}

// ─── Estimation ──────────────────────────────────────────────

#[derive(Deserialize)]
struct EstimateRequest {
    description: String,
}

/// Advisory estimate for a free-text description. Never touches the store.
async fn estimate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<EstimateRequest>,
) -> Result<Json<EmissionEstimate>> {
    let description = request.description.trim();
    if description.is_empty() {
        return Err(AppError::Validation(
            "Description must not be empty".to_string(),
        ));
    }
    if description.chars().count() > MAX_ESTIMATE_DESCRIPTION_LEN {
        return Err(AppError::Validation(format!(
            "Description must be at most {} characters",
            MAX_ESTIMATE_DESCRIPTION_LEN
        )));
    }

    let estimate = state.estimator.estimate(description).await.map_err(|e| {
        tracing::warn!(user_id = %user.user_id, error = %e, "Emission estimate failed");
        e
    })?;
    Ok(Json(estimate))
}

// ─── Certificates ────────────────────────────────────────────

async fn list_certificates(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Certificate>>> {
    Ok(Json(state.certificates.list(&user.user_id).await?))
}

async fn mint_certificate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<(StatusCode, Json<Certificate>)> {
    let certificate = state.certificates.mint(&user.user_id).await?;
    Ok((StatusCode::CREATED, Json(certificate)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_round_trip() {
        let cursor = ActivityQueryCursor {
            logged_at: chrono::DateTime::from_timestamp(1_704_103_200, 123).unwrap(),
            activity_id: Uuid::new_v4(),
        };

        let encoded = encode_cursor(cursor);
        let decoded = parse_cursor(Some(&encoded)).unwrap().unwrap();

        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_cursor_rejects_invalid_input() {
        let err = parse_cursor(Some("not-base64!")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let bad_id = URL_SAFE_NO_PAD.encode("1704103200:0:42");
        let err = parse_cursor(Some(&bad_id)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_missing_cursor() {
        assert!(parse_cursor(None).unwrap().is_none());
    }
}
