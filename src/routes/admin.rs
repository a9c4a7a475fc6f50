// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Admin routes: activity management, closure, enrollment review, dashboard.
//!
//! `require_admin` is applied in routes/mod.rs for everything returned here.

use crate::error::{AppError, Result};
use crate::models::{Activity, ActivityPatch, AdminSummary, Enrollment, NewActivity, StatusChange};
use crate::services::admin::{DEFAULT_RECENT_N, DEFAULT_TOP_N};
use crate::services::ClosureOutcome;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/activities", post(create_activity))
        .route(
            "/api/admin/activities/{id}",
            put(update_activity).delete(delete_activity),
        )
        .route("/api/admin/activities/{id}/close", post(close_activity))
        .route(
            "/api/admin/activities/{id}/enrollments",
            get(list_activity_enrollments),
        )
        .route("/api/admin/enrollments/{id}/status", put(set_enrollment_status))
        .route("/api/admin/dashboard", get(dashboard))
}

// ─── Activities ──────────────────────────────────────────────

async fn create_activity(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<NewActivity>, JsonRejection>,
) -> Result<(StatusCode, Json<Activity>)> {
    let Json(request) = body?;
    let activity = state.registry.create(request).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

async fn update_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: std::result::Result<Json<ActivityPatch>, JsonRejection>,
) -> Result<Json<Activity>> {
    let Json(patch) = body?;
    let activity = state.registry.update(&id, patch).await?;
    Ok(Json(activity))
}

async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.registry.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Closure ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    #[serde(default, alias = "motivo", alias = "motivo_cierre")]
    pub reason: String,
}

async fn close_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: std::result::Result<Json<CloseRequest>, JsonRejection>,
) -> Result<Json<ClosureOutcome>> {
    let Json(request) = body?;
    let outcome = state.closure.close(&id, &request.reason).await?;
    Ok(Json(outcome))
}

// ─── Enrollment Review ───────────────────────────────────────

async fn list_activity_enrollments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Enrollment>>> {
    state.registry.get(&id).await?;
    let enrollments = state.ledger.list_for_activity(&id).await?;
    Ok(Json(enrollments))
}

async fn set_enrollment_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: std::result::Result<Json<StatusChange>, JsonRejection>,
) -> Result<Json<Enrollment>> {
    let Json(change) = body?;
    let enrollment = state.ledger.set_status(&id, change.status).await?;
    Ok(Json(enrollment))
}

// ─── Dashboard ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    #[serde(default = "default_top_n")]
    pub top: usize,
    #[serde(default = "default_recent_n")]
    pub recent: usize,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_recent_n() -> usize {
    DEFAULT_RECENT_N
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<DashboardParams>, QueryRejection>,
) -> Result<Json<AdminSummary>> {
    let Query(params) = params?;
    if params.top == 0 || params.recent == 0 {
        return Err(AppError::validation("top", "limits must be positive"));
    }
    let summary = state.admin.summary(params.top, params.recent).await?;
    Ok(Json(summary))
}
