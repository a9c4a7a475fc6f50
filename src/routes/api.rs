// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! API routes for authenticated users (students and admins alike).

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Activity, ActivityFilter, Enrollment};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/activities", get(list_activities))
        .route("/api/activities/{id}", get(get_activity))
        .route("/api/activities/{id}/enrollments", post(enroll))
        .route("/api/enrollments/me", get(my_enrollments))
        .route("/api/enrollments/{id}", delete(cancel_enrollment))
}

// ─── Session ─────────────────────────────────────────────────

async fn get_me(Extension(user): Extension<AuthUser>) -> Json<AuthUser> {
    Json(user)
}

// ─── Activities ──────────────────────────────────────────────

/// Activity plus the caller's enrollment badge.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityListItem {
    #[serde(flatten)]
    pub activity: Activity,
    pub enrolled: bool,
}

async fn list_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    filter: std::result::Result<Query<ActivityFilter>, QueryRejection>,
) -> Result<Json<Vec<ActivityListItem>>> {
    let Query(filter) = filter?;
    let (activities, mine) = tokio::try_join!(
        state.registry.list(&filter),
        state.ledger.list_active_for_student(&user.user_id),
    )?;
    let enrolled: HashSet<&str> = mine.iter().map(|e| e.activity_id.as_str()).collect();

    let items = activities
        .into_iter()
        .map(|activity| ActivityListItem {
            enrolled: enrolled.contains(activity.id.as_str()),
            activity,
        })
        .collect();
    Ok(Json(items))
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Activity>> {
    let activity = state.registry.get(&id).await?;
    Ok(Json(activity))
}

// ─── Enrollments ─────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct EnrollRequest {
    #[serde(default, alias = "notas")]
    pub notes: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EnrollResponse {
    pub enrollment: Enrollment,
    pub already_enrolled: bool,
}

/// `201` for a new (or re-activated) enrollment, `200` when the student was
/// already enrolled. Other failures keep their error status.
async fn enroll(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<EnrollResponse>)> {
    // The body is optional: an empty POST enrolls without notes.
    let request: EnrollRequest = if body.iter().all(u8::is_ascii_whitespace) {
        EnrollRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?
    };

    match state
        .ledger
        .enroll(&user.student(), &activity_id, request.notes)
        .await
    {
        Ok(enrollment) => Ok((
            StatusCode::CREATED,
            Json(EnrollResponse {
                enrollment,
                already_enrolled: false,
            }),
        )),
        Err(AppError::AlreadyEnrolled(existing)) => Ok((
            StatusCode::OK,
            Json(EnrollResponse {
                enrollment: *existing,
                already_enrolled: true,
            }),
        )),
        Err(e) => Err(e),
    }
}

/// Enrollment with the activity it points to (if it still exists).
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MyEnrollment {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub activity: Option<Activity>,
}

async fn my_enrollments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<MyEnrollment>>> {
    let enrollments = state.ledger.list_active_for_student(&user.user_id).await?;

    let ids: Vec<String> = enrollments.iter().map(|e| e.activity_id.clone()).collect();
    let activities = state.db.get_activities_by_ids(&ids).await?;

    let items = enrollments
        .into_iter()
        .map(|enrollment| MyEnrollment {
            activity: activities
                .iter()
                .find(|a| a.id == enrollment.activity_id)
                .cloned(),
            enrollment,
        })
        .collect();
    Ok(Json(items))
}

async fn cancel_enrollment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Enrollment>> {
    let enrollment = state.ledger.cancel(&user, &id).await?;
    Ok(Json(enrollment))
}
