// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Concurrent enrollment and attendance tests (emulator).

use futures_util::future::join_all;
use souls::error::AppError;
use souls::models::{ActivityPatch, ActivityStatus, AttendanceOutcome, AttendanceUpdate};

mod common;
use common::{activity_request, create_emulator_app, student, unique_id};

#[tokio::test]
async fn test_concurrent_enroll_same_student() {
    require_emulator!();

    let (_, state) = create_emulator_app().await;
    let activity = state
        .registry
        .create(activity_request("Maratón solidaria", "2026-12-12T08:00:00Z", None))
        .await
        .unwrap();
    let s1 = student(&unique_id("s"));

    let attempts = (0..8).map(|_| {
        let ledger = state.ledger.clone();
        let summary = s1.student();
        let activity_id = activity.id.clone();
        async move { ledger.enroll(&summary, &activity_id, None).await }
    });
    let results = join_all(attempts).await;

    let created = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::AlreadyEnrolled(_))))
        .count();
    assert_eq!(created, 1, "exactly one attempt should create the enrollment");
    assert_eq!(duplicates, 7);

    let rows = state.ledger.list_for_activity(&activity.id).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_concurrent_enroll_many_students() {
    require_emulator!();

    let (_, state) = create_emulator_app().await;
    let activity = state
        .registry
        .create(activity_request("Colecta", "2026-12-13T08:00:00Z", None))
        .await
        .unwrap();
    let students: Vec<_> = (0..10).map(|i| student(&unique_id(&format!("s{}", i)))).collect();

    let attempts = students.iter().map(|s| {
        let ledger = state.ledger.clone();
        let summary = s.student();
        let activity_id = activity.id.clone();
        async move { ledger.enroll(&summary, &activity_id, None).await }
    });
    for result in join_all(attempts).await {
        result.unwrap();
    }

    let rows = state.ledger.list_for_activity(&activity.id).await.unwrap();
    assert_eq!(rows.len(), students.len());
}

#[tokio::test]
async fn test_concurrent_attendance_updates_are_not_lost() {
    require_emulator!();

    let (_, state) = create_emulator_app().await;
    let activity = state
        .registry
        .create(activity_request("Biblioteca móvil", "2026-12-14T08:00:00Z", None))
        .await
        .unwrap();
    let students: Vec<_> = (0..6).map(|i| student(&unique_id(&format!("s{}", i)))).collect();
    for s in &students {
        state.ledger.enroll(&s.student(), &activity.id, None).await.unwrap();
    }
    let roster = state.attendance.create_roster(&activity.id).await.unwrap();

    // One single-student batch per student, all at once
    let saves = students.iter().map(|s| {
        let attendance = state.attendance.clone();
        let roster_id = roster.id.clone();
        let update = AttendanceUpdate {
            student_id: s.user_id.clone(),
            outcome: AttendanceOutcome::Presente,
        };
        async move { attendance.update_attendance(&roster_id, &[update]).await }
    });
    for result in join_all(saves).await {
        result.unwrap();
    }

    let stored = state.attendance.get_for_activity(&activity.id).await.unwrap();
    assert_eq!(stored.count(AttendanceOutcome::Presente), students.len() as u32);
}

#[tokio::test]
async fn test_concurrent_close_has_single_winner() {
    require_emulator!();

    let (_, state) = create_emulator_app().await;
    let activity = state
        .registry
        .create(activity_request("Pintura de murales", "2026-12-15T08:00:00Z", None))
        .await
        .unwrap();

    let reasons: Vec<String> = (0..4).map(|i| format!("motivo {}", i)).collect();
    let attempts = reasons.iter().map(|reason| {
        let closure = state.closure.clone();
        let activity_id = activity.id.clone();
        async move { closure.close(&activity_id, reason).await }
    });
    let results = join_all(attempts).await;

    let winners: Vec<usize> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_ok())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(winners.len(), 1, "exactly one closer should commit");
    let losers = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::AlreadyClosed)))
        .count();
    assert_eq!(losers, reasons.len() - 1);

    let stored = state.registry.get(&activity.id).await.unwrap();
    assert_eq!(stored.status, ActivityStatus::Closed);
    assert_eq!(
        stored.closure_reason.as_deref(),
        Some(reasons[winners[0]].as_str())
    );
}

#[tokio::test]
async fn test_concurrent_reenroll_after_cancel() {
    require_emulator!();

    let (_, state) = create_emulator_app().await;
    let activity = state
        .registry
        .create(activity_request("Reciclaje", "2026-12-16T08:00:00Z", None))
        .await
        .unwrap();
    let s1 = student(&unique_id("s"));
    let first = state
        .ledger
        .enroll(&s1.student(), &activity.id, None)
        .await
        .unwrap();
    state.ledger.cancel(&s1, &first.id).await.unwrap();

    let attempts = (0..4).map(|_| {
        let ledger = state.ledger.clone();
        let summary = s1.student();
        let activity_id = activity.id.clone();
        async move { ledger.enroll(&summary, &activity_id, None).await }
    });
    let results = join_all(attempts).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(AppError::AlreadyEnrolled(_))))
            .count(),
        3
    );

    let rows = state.ledger.list_for_activity(&activity.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_active());
}

#[tokio::test]
async fn test_update_racing_close_keeps_closure() {
    require_emulator!();

    let (_, state) = create_emulator_app().await;
    let activity = state
        .registry
        .create(activity_request("Ollas comunes", "2026-12-17T08:00:00Z", None))
        .await
        .unwrap();

    let patch: ActivityPatch =
        serde_json::from_value(serde_json::json!({"title": "Ollas comunes (centro)"})).unwrap();
    let update = state.registry.update(&activity.id, patch);
    let close = state.closure.close(&activity.id, "suspendida");
    let (updated, closed) = tokio::join!(update, close);
    updated.unwrap();
    closed.unwrap();

    let stored = state.registry.get(&activity.id).await.unwrap();
    assert_eq!(stored.status, ActivityStatus::Closed);
    assert_eq!(stored.closure_reason.as_deref(), Some("suspendida"));
    assert_eq!(stored.title, "Ollas comunes (centro)");
}
