// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard projection and realtime feed.

use green_tracker::models::{NewActivity, ProfileUpdate};
use green_tracker::services::leaderboard::get_leaderboard;
use green_tracker::services::LeaderboardEvent;
use green_tracker::AppState;

mod common;
use common::test_state;

async fn log(state: &AppState, user_id: &str, category_id: &str, quantity: f64) {
    state
        .recorder
        .log_activity(
            user_id,
            NewActivity {
                category_id: Some(category_id.to_string()),
                quantity: Some(quantity),
                description: Some("test activity".to_string()),
                logged_at: None,
            },
        )
        .await
        .unwrap();
}

async fn hide(state: &AppState, user_id: &str) {
    state
        .aggregates
        .update_profile(
            user_id,
            &ProfileUpdate {
                display_name: None,
                show_on_leaderboard: Some(false),
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_leaderboard_order_and_visibility() {
    let state = test_state();

    log(&state, "heavy", "flight", 1000.0).await;
    log(&state, "light", "bus", 5.0).await;
    log(&state, "medium", "car", 50.0).await;
    log(&state, "shy", "train", 1.0).await;
    hide(&state, "shy").await;

    let board = get_leaderboard(state.store.as_ref(), 10).await.unwrap();

    let users: Vec<&str> = board.iter().map(|e| e.user_id.as_str()).collect();
    assert_eq!(users, vec!["light", "medium", "heavy"]);
    assert!(board
        .windows(2)
        .all(|w| w[0].total_carbon_footprint <= w[1].total_carbon_footprint));
    let ranks: Vec<u32> = board.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_leaderboard_limit() {
    let state = test_state();

    for i in 0..5 {
        log(&state, &format!("user-{}", i), "car", 1.0 + i as f64).await;
    }

    let board = get_leaderboard(state.store.as_ref(), 2).await.unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].user_id, "user-0");
}

#[tokio::test]
async fn test_opting_back_in_restores_row() {
    let state = test_state();

    log(&state, "returner", "car", 10.0).await;
    hide(&state, "returner").await;
    assert!(get_leaderboard(state.store.as_ref(), 10)
        .await
        .unwrap()
        .is_empty());

    state
        .aggregates
        .update_profile(
            "returner",
            &ProfileUpdate {
                display_name: None,
                show_on_leaderboard: Some(true),
            },
        )
        .await
        .unwrap();

    let board = get_leaderboard(state.store.as_ref(), 10).await.unwrap();
    assert_eq!(board.len(), 1);
    assert!((board[0].total_carbon_footprint - 2.1).abs() < 1e-9);
}

#[tokio::test]
async fn test_feed_publishes_every_commit() {
    let state = test_state();
    let mut rx = state.feed.subscribe();

    log(&state, "live", "car", 10.0).await;
    match rx.try_recv().unwrap() {
        LeaderboardEvent::Upsert(entry) => {
            assert_eq!(entry.user_id, "live");
            assert!((entry.total_carbon_footprint - 2.1).abs() < 1e-9);
        }
        other => panic!("expected upsert, got {:?}", other),
    }

    hide(&state, "live").await;
    assert_eq!(
        rx.try_recv().unwrap(),
        LeaderboardEvent::Remove {
            user_id: "live".to_string()
        }
    );

    state.aggregates.delete_user("live").await.unwrap();
    assert!(matches!(
        rx.try_recv().unwrap(),
        LeaderboardEvent::Remove { .. }
    ));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_write_publishes_nothing() {
    let state = test_state();
    let mut rx = state.feed.subscribe();

    let result = state
        .recorder
        .log_activity(
            "nobody",
            NewActivity {
                category_id: Some("unknown".to_string()),
                quantity: Some(1.0),
                description: Some("test activity".to_string()),
                logged_at: None,
            },
        )
        .await;

    assert!(result.is_err());
    assert!(rx.try_recv().is_err());
}
