// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Enrollment ledger: student enrollments and their admin-driven status.

use chrono::Utc;

use crate::db::{FirestoreDb, InsertOutcome, Modified};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Enrollment, EnrollmentStatus, StudentSummary};
use crate::services::notifier::{Notification, NotificationService};
use crate::services::ActivityRegistry;

#[derive(Clone)]
pub struct EnrollmentLedger {
    db: FirestoreDb,
    registry: ActivityRegistry,
    notifier: NotificationService,
}

impl EnrollmentLedger {
    pub fn new(db: FirestoreDb, notifier: NotificationService) -> Self {
        Self {
            registry: ActivityRegistry::new(db.clone()),
            db,
            notifier,
        }
    }

    /// Enroll a student.
    ///
    /// Checks run in order: activity exists, activity accepts enrollments,
    /// no active enrollment for the pair. A cancelled row for the pair is
    /// re-activated instead of creating a second one.
    pub async fn enroll(
        &self,
        student: &StudentSummary,
        activity_id: &str,
        notes: Option<String>,
    ) -> Result<Enrollment> {
        let activity = self.registry.get(activity_id).await?;
        activity.ensure_accepting_enrollments()?;

        let now = Utc::now();
        let fresh = Enrollment::new(activity_id, student, notes.clone(), now);
        let enrollment = match self.db.create_enrollment(&fresh).await? {
            InsertOutcome::Created(created) => created,
            // Re-activation is checked against the row read inside the write
            // transaction; a concurrent re-enroll makes this one `AlreadyEnrolled`.
            InsertOutcome::AlreadyExists(_) => {
                let modified = self
                    .db
                    .modify_enrollment(&fresh.id, |existing| {
                        *existing = existing.clone().reenroll(student, notes.clone(), now)?;
                        Ok(true)
                    })
                    .await?;
                match modified {
                    Modified::Written(reactivated) | Modified::Unchanged(reactivated) => {
                        reactivated
                    }
                    Modified::Missing => {
                        return Err(AppError::Conflict(format!(
                            "Enrollment {} was removed concurrently",
                            fresh.id
                        )))
                    }
                }
            }
        };

        tracing::info!(
            activity_id,
            student_id = %student.id,
            enrollment_id = %enrollment.id,
            "Student enrolled"
        );
        Ok(enrollment)
    }

    pub async fn get(&self, enrollment_id: &str) -> Result<Enrollment> {
        self.db
            .get_enrollment(enrollment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Enrollment {}", enrollment_id)))
    }

    /// Soft-cancel. Students may only cancel their own enrollments.
    pub async fn cancel(&self, user: &AuthUser, enrollment_id: &str) -> Result<Enrollment> {
        let now = Utc::now();
        let modified = self
            .db
            .modify_enrollment(enrollment_id, |enrollment| {
                if !user.is_admin() && enrollment.student_id != user.user_id {
                    return Err(AppError::Forbidden(
                        "Cannot cancel another student's enrollment".to_string(),
                    ));
                }
                Ok(enrollment.cancel(now))
            })
            .await?;

        match modified {
            Modified::Missing => Err(AppError::NotFound(format!("Enrollment {}", enrollment_id))),
            Modified::Unchanged(enrollment) => Ok(enrollment),
            Modified::Written(enrollment) => {
                tracing::info!(
                    enrollment_id,
                    cancelled_by = %user.user_id,
                    "Enrollment cancelled"
                );
                Ok(enrollment)
            }
        }
    }

    /// Non-cancelled enrollments of a student, newest first.
    pub async fn list_active_for_student(&self, student_id: &str) -> Result<Vec<Enrollment>> {
        let mut enrollments: Vec<Enrollment> = self
            .db
            .list_enrollments_for_student(student_id)
            .await?
            .into_iter()
            .filter(Enrollment::is_active)
            .collect();
        enrollments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(enrollments)
    }

    /// Every enrollment of an activity, oldest first.
    pub async fn list_for_activity(&self, activity_id: &str) -> Result<Vec<Enrollment>> {
        let mut enrollments = self.db.list_enrollments_for_activity(activity_id).await?;
        enrollments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(enrollments)
    }

    /// Admin status change. Confirming sends a notification.
    pub async fn set_status(
        &self,
        enrollment_id: &str,
        status: EnrollmentStatus,
    ) -> Result<Enrollment> {
        let now = Utc::now();
        let enrollment = match self
            .db
            .modify_enrollment(enrollment_id, |enrollment| enrollment.set_status(status, now))
            .await?
        {
            Modified::Missing => {
                return Err(AppError::NotFound(format!("Enrollment {}", enrollment_id)))
            }
            Modified::Unchanged(enrollment) => return Ok(enrollment),
            Modified::Written(enrollment) => enrollment,
        };

        tracing::info!(
            enrollment_id,
            status = status.as_str(),
            "Enrollment status changed"
        );

        if status == EnrollmentStatus::Confirmado {
            match self.db.get_activity(&enrollment.activity_id).await? {
                Some(activity) => self
                    .notifier
                    .notify(Notification::enrollment_confirmed(&activity, &enrollment)),
                None => tracing::warn!(
                    enrollment_id,
                    activity_id = %enrollment.activity_id,
                    "Confirmed enrollment references a missing activity"
                ),
            }
        }
        Ok(enrollment)
    }
}
