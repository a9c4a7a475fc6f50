// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Admin routes for attendance rosters and impact reports.

use crate::error::{AppError, Result};
use crate::models::{AttendanceRoster, AttendanceUpdate, ImpactReport, ReportOverrides};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    routing::{post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/admin/activities/{id}/roster",
            post(create_roster).get(get_roster),
        )
        .route("/api/admin/rosters/{id}/refresh", post(refresh_roster))
        .route("/api/admin/rosters/{id}/attendance", put(update_attendance))
        .route(
            "/api/admin/activities/{id}/report",
            post(save_report).get(get_report),
        )
}

// ─── Rosters ─────────────────────────────────────────────────

async fn create_roster(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<String>,
) -> Result<Json<AttendanceRoster>> {
    let roster = state.attendance.create_roster(&activity_id).await?;
    Ok(Json(roster))
}

async fn get_roster(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<String>,
) -> Result<Json<AttendanceRoster>> {
    let roster = state.attendance.get_for_activity(&activity_id).await?;
    Ok(Json(roster))
}

async fn refresh_roster(
    State(state): State<Arc<AppState>>,
    Path(roster_id): Path<String>,
) -> Result<Json<AttendanceRoster>> {
    let roster = state.attendance.refresh_roster(&roster_id).await?;
    Ok(Json(roster))
}

/// Accepts either `{"updates": [...]}` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AttendanceBatch {
    Wrapped {
        #[serde(alias = "asistencias")]
        updates: Vec<AttendanceUpdate>,
    },
    Bare(Vec<AttendanceUpdate>),
}

impl AttendanceBatch {
    fn into_updates(self) -> Vec<AttendanceUpdate> {
        match self {
            AttendanceBatch::Wrapped { updates } | AttendanceBatch::Bare(updates) => updates,
        }
    }
}

async fn update_attendance(
    State(state): State<Arc<AppState>>,
    Path(roster_id): Path<String>,
    body: std::result::Result<Json<AttendanceBatch>, JsonRejection>,
) -> Result<Json<AttendanceRoster>> {
    let Json(batch) = body?;
    let updates = batch.into_updates();
    if updates.is_empty() {
        return Err(AppError::validation("updates", "at least one update is required"));
    }
    let roster = state
        .attendance
        .update_attendance(&roster_id, &updates)
        .await?;
    Ok(Json(roster))
}

// ─── Reports ─────────────────────────────────────────────────

async fn save_report(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<String>,
    body: Bytes,
) -> Result<Json<ImpactReport>> {
    // No body means "generate with computed values only".
    let overrides: ReportOverrides = if body.iter().all(u8::is_ascii_whitespace) {
        ReportOverrides::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?
    };
    let report = state
        .reports
        .generate_or_update(&activity_id, overrides)
        .await?;
    Ok(Json(report))
}

async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<String>,
) -> Result<Json<ImpactReport>> {
    let report = state.reports.get(&activity_id).await?;
    Ok(Json(report))
}
