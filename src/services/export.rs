// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! CSV exports of the enrollment ledger and attendance rosters.

use serde::Serialize;
use std::collections::HashMap;

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::dashboard::DELETED_ACTIVITY_TITLE;
use crate::models::{Activity, AttendanceRoster, Enrollment, EnrollmentStatus};
use crate::time_utils::format_utc_rfc3339;

#[derive(Debug, Serialize)]
struct EnrollmentRow<'a> {
    enrollment_id: &'a str,
    activity_id: &'a str,
    activity_title: &'a str,
    student_id: &'a str,
    student_name: &'a str,
    student_email: &'a str,
    status: &'static str,
    created_at: String,
    cancelled_at: String,
    notes: &'a str,
}

#[derive(Debug, Serialize)]
struct AttendanceRow<'a> {
    activity_id: &'a str,
    activity_title: &'a str,
    student_id: &'a str,
    student_name: &'a str,
    student_email: &'a str,
    outcome: &'static str,
    enrolled: bool,
    recorded_at: String,
}

fn titles(activities: &[Activity]) -> HashMap<&str, &str> {
    activities
        .iter()
        .map(|a| (a.id.as_str(), a.title.as_str()))
        .collect()
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("CSV flush failed: {}", e)))
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("CSV write failed: {}", e))
}

/// Render enrollments as CSV, one row per ledger entry.
pub fn enrollments_csv(activities: &[Activity], enrollments: &[Enrollment]) -> Result<Vec<u8>> {
    let titles = titles(activities);
    let mut writer = csv::Writer::from_writer(Vec::new());

    for e in enrollments {
        writer
            .serialize(EnrollmentRow {
                enrollment_id: &e.id,
                activity_id: &e.activity_id,
                activity_title: titles
                    .get(e.activity_id.as_str())
                    .copied()
                    .unwrap_or(DELETED_ACTIVITY_TITLE),
                student_id: &e.student_id,
                student_name: e.student_name.as_deref().unwrap_or_default(),
                student_email: e.student_email.as_deref().unwrap_or_default(),
                status: e.status.as_str(),
                created_at: format_utc_rfc3339(e.created_at),
                cancelled_at: e.cancelled_at.map(format_utc_rfc3339).unwrap_or_default(),
                notes: e.notes.as_deref().unwrap_or_default(),
            })
            .map_err(csv_error)?;
    }

    finish(writer)
}

/// Render rosters as CSV, one row per roster entry.
pub fn attendance_csv(activities: &[Activity], rosters: &[AttendanceRoster]) -> Result<Vec<u8>> {
    let titles = titles(activities);
    let mut writer = csv::Writer::from_writer(Vec::new());

    for roster in rosters {
        let activity_title = titles
            .get(roster.activity_id.as_str())
            .copied()
            .unwrap_or(DELETED_ACTIVITY_TITLE);
        for entry in &roster.entries {
            writer
                .serialize(AttendanceRow {
                    activity_id: &roster.activity_id,
                    activity_title,
                    student_id: &entry.student.id,
                    student_name: entry.student.name.as_deref().unwrap_or_default(),
                    student_email: entry.student.email.as_deref().unwrap_or_default(),
                    outcome: entry.outcome.as_str(),
                    enrolled: entry.enrolled,
                    recorded_at: entry.recorded_at.map(format_utc_rfc3339).unwrap_or_default(),
                })
                .map_err(csv_error)?;
        }
    }

    finish(writer)
}

#[derive(Clone)]
pub struct ExportService {
    db: FirestoreDb,
}

impl ExportService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    pub async fn enrollments(
        &self,
        activity_id: Option<&str>,
        status: Option<EnrollmentStatus>,
    ) -> Result<Vec<u8>> {
        let mut enrollments = match activity_id {
            Some(id) => self.db.list_enrollments_for_activity(id).await?,
            None => self.db.list_enrollments().await?,
        };
        if let Some(status) = status {
            enrollments.retain(|e| e.status == status);
        }
        enrollments.sort_by(|a, b| {
            a.activity_id
                .cmp(&b.activity_id)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });

        let activities = self.db.list_activities().await?;
        tracing::info!(rows = enrollments.len(), "Exporting enrollments");
        enrollments_csv(&activities, &enrollments)
    }

    pub async fn attendance(&self, activity_id: Option<&str>) -> Result<Vec<u8>> {
        let mut rosters: Vec<AttendanceRoster> = match activity_id {
            Some(id) => self
                .db
                .get_roster(&AttendanceRoster::id_for(id))
                .await?
                .into_iter()
                .collect(),
            None => self.db.list_rosters().await?,
        };
        rosters.sort_by(|a, b| a.activity_id.cmp(&b.activity_id));

        let activities = self.db.list_activities().await?;
        tracing::info!(rosters = rosters.len(), "Exporting attendance");
        attendance_csv(&activities, &rosters)
    }
}
