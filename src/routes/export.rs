// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! CSV export routes (admin).

use crate::error::Result;
use crate::models::EnrollmentStatus;
use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/export/enrollments", get(export_enrollments))
        .route("/api/admin/export/attendance", get(export_attendance))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    #[serde(default, alias = "convocatoria_id")]
    pub activity_id: Option<String>,
    #[serde(default, alias = "estado")]
    pub status: Option<EnrollmentStatus>,
}

fn attachment(filename: &str, body: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
}

async fn export_enrollments(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<ExportParams>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(params) = params?;
    let csv = state
        .export
        .enrollments(params.activity_id.as_deref(), params.status)
        .await?;
    Ok(attachment("enrollments.csv", csv))
}

async fn export_attendance(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Query<ExportParams>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(params) = params?;
    let csv = state
        .export
        .attendance(params.activity_id.as_deref())
        .await?;
    Ok(attachment("attendance.csv", csv))
}
