// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with FIRESTORE_EMULATOR_HOST pointing at a local emulator.
//!
//! The emulator provides a clean state for each test run; user ids are
//! unique per test so runs against a shared emulator do not collide.

use chrono::{DateTime, Utc};
use green_tracker::db::{FirestoreDb, Store};
use green_tracker::error::AppError;
use green_tracker::models::{ActivityChange, ActivityRecord, NewActivity, ProfileUpdate};
use std::sync::Arc;
use uuid::Uuid;

mod common;
use common::{test_db, test_state_with, unique_user_id};

fn record(user_id: &str, carbon_amount: f64, green_points_earned: i64) -> ActivityRecord {
    ActivityRecord {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        category_id: "car".to_string(),
        description: "integration".to_string(),
        quantity: 1.0,
        carbon_amount,
        green_points_earned,
        // Whole seconds so the stored copy compares equal.
        logged_at: DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// OFFLINE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_offline_store_reports_database_error() {
    let db = FirestoreDb::new_mock();

    let err = db.get_profile("anyone").await.unwrap_err();
    assert!(matches!(err, AppError::Database(_)));

    let err = db
        .commit_activity_change(&ActivityChange::Inserted(record("anyone", 1.0, 0)), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
}

// ═══════════════════════════════════════════════════════════════════════════
// CATEGORIES
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_seed_and_read_categories() {
    require_emulator!();

    let db = test_db().await;
    let seeded = db.seed_categories().await.unwrap();

    let categories = db.list_categories().await.unwrap();
    assert!(categories.len() >= seeded);

    let recycling = db.get_category("recycling").await.unwrap().unwrap();
    assert_eq!(recycling.emission_factor, -0.85);
    assert!(db.get_category("hoverboard").await.unwrap().is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// AGGREGATES
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_commit_maintains_aggregate_and_leaderboard() {
    require_emulator!();

    let db = test_db().await;
    let user = unique_user_id("fs-agg");

    let first = record(&user, 10.0, 5);
    let entry = db
        .commit_activity_change(&ActivityChange::Inserted(first.clone()), Utc::now())
        .await
        .unwrap();
    assert_eq!(entry.total_carbon_footprint, 10.0);
    assert_eq!(entry.total_green_points, 5);

    let second = record(&user, -12.5, 125);
    db.commit_activity_change(&ActivityChange::Inserted(second.clone()), Utc::now())
        .await
        .unwrap();
    let aggregate = db.get_profile(&user).await.unwrap().unwrap();
    assert_eq!(aggregate.total_carbon_footprint, 0.0);
    assert_eq!(aggregate.total_green_points, 130);

    // Clamp drift survives the round trip through the store.
    db.commit_activity_change(&ActivityChange::Deleted(second), Utc::now())
        .await
        .unwrap();
    let aggregate = db.get_profile(&user).await.unwrap().unwrap();
    assert_eq!(aggregate.total_carbon_footprint, 12.5);
    assert_eq!(aggregate.total_green_points, 5);

    let rows = db.leaderboard_entries().await.unwrap();
    let row = rows.iter().find(|r| r.user_id == user).unwrap();
    assert_eq!(row.total_carbon_footprint, 12.5);

    assert!(db.delete_user_data(&user).await.unwrap() > 0);
    assert!(db.get_profile(&user).await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_commits_are_not_lost() {
    require_emulator!();

    const WRITERS: usize = 8;
    let db = Arc::new(test_db().await);
    let user = unique_user_id("fs-race");

    let mut handles = Vec::new();
    for i in 0..WRITERS {
        let db = db.clone();
        let r = record(&user, 1.0 + i as f64, 0);
        handles.push(tokio::spawn(async move {
            db.commit_activity_change(&ActivityChange::Inserted(r), Utc::now())
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // 1 + 2 + ... + 8, every delta applied exactly once.
    let aggregate = db.get_profile(&user).await.unwrap().unwrap();
    assert_eq!(aggregate.total_carbon_footprint, 36.0);

    let history = db.list_activities_for_user(&user, None, None).await.unwrap();
    assert_eq!(history.len(), WRITERS);

    db.delete_user_data(&user).await.unwrap();
}

#[tokio::test]
async fn test_stale_delete_conflicts() {
    require_emulator!();

    let db = test_db().await;
    let user = unique_user_id("fs-stale");

    let original = record(&user, 3.0, 0);
    db.commit_activity_change(&ActivityChange::Inserted(original.clone()), Utc::now())
        .await
        .unwrap();

    let stored = db.get_activity(original.id).await.unwrap().unwrap();
    let mut edited = stored.clone();
    edited.quantity = 2.0;
    edited.carbon_amount = 6.0;
    db.commit_activity_change(
        &ActivityChange::Updated {
            old: stored.clone(),
            new: edited,
        },
        Utc::now(),
    )
    .await
    .unwrap();

    let err = db
        .commit_activity_change(&ActivityChange::Deleted(stored), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let aggregate = db.get_profile(&user).await.unwrap().unwrap();
    assert_eq!(aggregate.total_carbon_footprint, 6.0);

    db.delete_user_data(&user).await.unwrap();
}

#[tokio::test]
async fn test_profile_visibility() {
    require_emulator!();

    let db = Arc::new(test_db().await);
    db.seed_categories().await.unwrap();
    let state = test_state_with(db.clone());
    let user = unique_user_id("fs-shy");

    state
        .recorder
        .log_activity(
            &user,
            NewActivity {
                category_id: Some("bus".to_string()),
                quantity: Some(10.0),
                description: Some("test activity".to_string()),
                logged_at: None,
            },
        )
        .await
        .unwrap();

    state
        .aggregates
        .update_profile(
            &user,
            &ProfileUpdate {
                display_name: Some("Shy".to_string()),
                show_on_leaderboard: Some(false),
            },
        )
        .await
        .unwrap();

    let rows = db.leaderboard_entries().await.unwrap();
    assert!(rows.iter().all(|r| r.user_id != user));

    state.aggregates.delete_user(&user).await.unwrap();
}

#[tokio::test]
async fn test_activity_pagination() {
    require_emulator!();

    let db = test_db().await;
    let user = unique_user_id("fs-pages");

    for i in 0..5 {
        let mut r = record(&user, 1.0, 0);
        r.logged_at = DateTime::from_timestamp(1_704_103_200 + i * 60, 0).unwrap();
        db.commit_activity_change(&ActivityChange::Inserted(r), Utc::now())
            .await
            .unwrap();
    }

    let first = db
        .list_activities_for_user(&user, None, Some(2))
        .await
        .unwrap();
    assert_eq!(first.len(), 2);
    assert!(first[0].logged_at > first[1].logged_at);

    let last = first.last().unwrap();
    let cursor = green_tracker::db::ActivityQueryCursor {
        logged_at: last.logged_at,
        activity_id: last.id,
    };
    let rest = db
        .list_activities_for_user(&user, Some(cursor), None)
        .await
        .unwrap();
    assert_eq!(rest.len(), 3);
    assert!(rest.iter().all(|r| r.logged_at < last.logged_at));

    db.delete_user_data(&user).await.unwrap();
}
