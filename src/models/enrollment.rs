// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Enrollment ("inscripción") ledger records.
//!
//! The document ID is derived from the (activity, student) pair, so the
//! ledger can never hold two rows for the same pair: re-enrolling after a
//! cancellation re-activates the existing row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::models::StudentSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    #[serde(alias = "enrolled")]
    Inscrito,
    #[serde(alias = "pending")]
    Pendiente,
    #[serde(alias = "confirmed")]
    Confirmado,
    #[serde(alias = "rejected")]
    Rechazado,
    #[serde(alias = "cancelled", alias = "canceled")]
    Cancelado,
}

impl EnrollmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentStatus::Inscrito => "inscrito",
            EnrollmentStatus::Pendiente => "pendiente",
            EnrollmentStatus::Confirmado => "confirmado",
            EnrollmentStatus::Rechazado => "rechazado",
            EnrollmentStatus::Cancelado => "cancelado",
        }
    }

    /// Everything except `cancelado` counts as an active claim on a spot.
    pub fn is_active(self) -> bool {
        self != EnrollmentStatus::Cancelado
    }
}

/// Stored enrollment record (document ID = `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Enrollment {
    pub id: String,
    #[serde(
        alias = "convocatoria_id",
        alias = "convocatoriaId",
        alias = "activityId",
        alias = "event_id"
    )]
    pub activity_id: String,
    #[serde(
        alias = "estudiante_id",
        alias = "usuario_id",
        alias = "userId",
        alias = "studentId"
    )]
    pub student_id: String,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub student_email: Option<String>,
    #[serde(alias = "estado")]
    pub status: EnrollmentStatus,
    #[serde(alias = "fecha_inscripcion", with = "crate::time_utils::flexible")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::time_utils::flexible")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
    #[serde(default, alias = "notas")]
    pub notes: Option<String>,
    #[serde(default, with = "crate::time_utils::flexible_option")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Set when the closure workflow addressed this enrollment.
    #[serde(default, with = "crate::time_utils::flexible_option")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub notified_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    /// Ledger key for a (activity, student) pair.
    pub fn key(activity_id: &str, student_id: &str) -> String {
        format!("{}_{}", activity_id, urlencoding::encode(student_id))
    }

    /// Fresh `inscrito` enrollment.
    pub fn new(
        activity_id: &str,
        student: &StudentSummary,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Self::key(activity_id, &student.id),
            activity_id: activity_id.to_string(),
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            student_email: student.email.clone(),
            status: EnrollmentStatus::Inscrito,
            created_at: now,
            updated_at: now,
            notes: clean_notes(notes),
            cancelled_at: None,
            notified_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn student(&self) -> StudentSummary {
        StudentSummary {
            id: self.student_id.clone(),
            name: self.student_name.clone(),
            email: self.student_email.clone(),
        }
    }

    /// Resolve an enroll request against the row already stored for the pair.
    ///
    /// An active row is a soft conflict; a cancelled one is re-activated.
    pub fn reenroll(
        mut self,
        student: &StudentSummary,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if self.is_active() {
            return Err(AppError::AlreadyEnrolled(Box::new(self)));
        }

        self.status = EnrollmentStatus::Inscrito;
        self.student_name = student.name.clone().or(self.student_name);
        self.student_email = student.email.clone().or(self.student_email);
        self.notes = clean_notes(notes);
        self.created_at = now;
        self.updated_at = now;
        self.cancelled_at = None;
        self.notified_at = None;
        Ok(self)
    }

    /// Soft-cancel. Returns `false` when already cancelled.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = EnrollmentStatus::Cancelado;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        true
    }

    /// Admin status change between active states. Returns `false` for a no-op.
    pub fn set_status(&mut self, status: EnrollmentStatus, now: DateTime<Utc>) -> Result<bool> {
        if status == EnrollmentStatus::Cancelado {
            return Err(AppError::validation(
                "status",
                "use the cancel operation to cancel an enrollment",
            ));
        }
        if !self.is_active() {
            return Err(AppError::Conflict(format!(
                "Enrollment {} is cancelled",
                self.id
            )));
        }
        if self.status == status {
            return Ok(false);
        }
        self.status = status;
        self.updated_at = now;
        Ok(true)
    }

    /// Closure handling: `pendiente` rows become `rechazado` and are stamped.
    ///
    /// Returns `true` if this enrollment belongs to the notification set.
    pub fn address_on_closure(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != EnrollmentStatus::Pendiente {
            return false;
        }
        self.status = EnrollmentStatus::Rechazado;
        self.notified_at = Some(now);
        self.updated_at = now;
        true
    }
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

/// Admin status-change request body.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    #[serde(alias = "estado")]
    pub status: EnrollmentStatus,
}
