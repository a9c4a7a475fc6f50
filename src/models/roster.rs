// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Attendance roster ("lista de asistencia"), one per activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::models::{Enrollment, StudentSummary};

/// Per-student attendance outcome. Entries start as `Ausente`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceOutcome {
    #[serde(alias = "present")]
    Presente,
    #[default]
    #[serde(alias = "absent")]
    Ausente,
    #[serde(alias = "excused", alias = "justificado")]
    Justificada,
}

impl AttendanceOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceOutcome::Presente => "presente",
            AttendanceOutcome::Ausente => "ausente",
            AttendanceOutcome::Justificada => "justificada",
        }
    }
}

fn default_enrolled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RosterEntry {
    #[serde(alias = "estudiante", alias = "usuario")]
    pub student: StudentSummary,
    #[serde(default, alias = "estado", alias = "asistencia")]
    pub outcome: AttendanceOutcome,
    /// Whether the student still held an active enrollment at the last refresh.
    #[serde(default = "default_enrolled")]
    pub enrolled: bool,
    /// Set once an admin records an outcome; `None` means still the default.
    #[serde(default, with = "crate::time_utils::flexible_option")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl RosterEntry {
    fn from_enrollment(enrollment: &Enrollment) -> Self {
        Self {
            student: enrollment.student(),
            outcome: AttendanceOutcome::default(),
            enrolled: true,
            recorded_at: None,
        }
    }

    pub fn is_recorded(&self) -> bool {
        self.recorded_at.is_some()
    }
}

/// Stored roster (document ID = `id`, derived from the activity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AttendanceRoster {
    pub id: String,
    #[serde(alias = "convocatoria_id", alias = "activityId")]
    pub activity_id: String,
    #[serde(default, alias = "asistentes")]
    pub entries: Vec<RosterEntry>,
    #[serde(with = "crate::time_utils::flexible")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::time_utils::flexible")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

/// One attendance change in a batch save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceUpdate {
    #[serde(alias = "estudiante_id", alias = "usuario_id", alias = "studentId")]
    pub student_id: String,
    #[serde(alias = "estado", alias = "asistencia")]
    pub outcome: AttendanceOutcome,
}

impl AttendanceRoster {
    /// Roster ID for an activity. One roster per activity, so the ID is derived.
    pub fn id_for(activity_id: &str) -> String {
        format!("roster_{}", activity_id)
    }

    /// Build a roster from the ledger: every active enrollment, all `Ausente`.
    pub fn from_enrollments(
        activity_id: &str,
        enrollments: &[Enrollment],
        now: DateTime<Utc>,
    ) -> Self {
        let mut roster = Self {
            id: Self::id_for(activity_id),
            activity_id: activity_id.to_string(),
            entries: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        roster.refresh(enrollments, now);
        roster
    }

    pub fn entry(&self, student_id: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.student.id == student_id)
    }

    /// Append-only merge with the current ledger.
    ///
    /// New active students are appended as `Ausente`. Existing entries keep
    /// their outcome; students who cancelled stay listed with `enrolled = false`.
    /// Returns the number of entries added.
    pub fn refresh(&mut self, enrollments: &[Enrollment], now: DateTime<Utc>) -> usize {
        let active: Vec<&Enrollment> = enrollments
            .iter()
            .filter(|e| e.activity_id == self.activity_id && e.is_active())
            .collect();
        let active_ids: HashSet<&str> = active.iter().map(|e| e.student_id.as_str()).collect();

        for entry in &mut self.entries {
            entry.enrolled = active_ids.contains(entry.student.id.as_str());
        }

        let mut known: HashSet<String> =
            self.entries.iter().map(|e| e.student.id.clone()).collect();
        let mut added = 0;
        for enrollment in active {
            if known.insert(enrollment.student_id.clone()) {
                self.entries.push(RosterEntry::from_enrollment(enrollment));
                added += 1;
            }
        }

        self.updated_at = now;
        added
    }

    /// Apply a batch of outcomes, all or nothing.
    ///
    /// The first student ID not on the roster fails the whole batch.
    pub fn apply_updates(&mut self, updates: &[AttendanceUpdate], now: DateTime<Utc>) -> Result<()> {
        let resolved = {
            let positions: HashMap<&str, usize> = self
                .entries
                .iter()
                .enumerate()
                .map(|(i, e)| (e.student.id.as_str(), i))
                .collect();

            let mut resolved = Vec::with_capacity(updates.len());
            for update in updates {
                let index = positions
                    .get(update.student_id.as_str())
                    .copied()
                    .ok_or_else(|| {
                        AppError::NotFound(format!(
                            "Student {} is not on roster {}",
                            update.student_id, self.id
                        ))
                    })?;
                resolved.push((index, update.outcome));
            }
            resolved
        };

        for (index, outcome) in resolved {
            let entry = &mut self.entries[index];
            entry.outcome = outcome;
            entry.recorded_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn count(&self, outcome: AttendanceOutcome) -> u32 {
        self.entries.iter().filter(|e| e.outcome == outcome).count() as u32
    }
}
