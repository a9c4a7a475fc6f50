// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Impact report: hours and participation metrics for one activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{Activity, AttendanceOutcome, AttendanceRoster, Enrollment};

/// Stored report (document ID = `id`, derived from the activity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ImpactReport {
    pub id: String,
    #[serde(alias = "convocatoria_id", alias = "activityId")]
    pub activity_id: String,
    #[serde(alias = "horas_totales", alias = "hoursTotales")]
    pub hours_total: f64,
    /// Hours were set by an admin and are not recomputed.
    #[serde(default)]
    pub hours_overridden: bool,
    #[serde(default, alias = "beneficiarios")]
    pub beneficiaries: Option<u32>,
    #[serde(default, alias = "voluntarios_asistentes")]
    pub volunteers_attended: u32,
    #[serde(default, alias = "voluntarios_confirmados")]
    pub volunteers_confirmed: u32,
    #[serde(default, alias = "notas")]
    pub notes: Option<String>,
    #[serde(with = "crate::time_utils::flexible")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::time_utils::flexible")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

/// Admin-supplied values. Absent fields keep their previous (or computed) value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ReportOverrides {
    #[serde(default, alias = "beneficiarios")]
    pub beneficiaries: Option<u32>,
    #[validate(range(min = 0.0, max = 1000000.0, message = "hours must be a non-negative number"))]
    #[serde(default, alias = "horas_totales", alias = "hoursTotales", alias = "horasTotales")]
    pub hours_total: Option<f64>,
    #[serde(default, alias = "notas")]
    pub notes: Option<String>,
    /// Recompute attendance-derived metrics from the current roster.
    #[serde(default, alias = "recalcular")]
    pub recompute: bool,
}

/// Metrics derived from the roster and the ledger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportMetrics {
    pub hours_total: f64,
    pub volunteers_attended: u32,
    pub volunteers_confirmed: u32,
}

impl ReportMetrics {
    /// `presente` count x activity duration; activities without an end time
    /// are credited `default_hours`.
    pub fn compute(
        activity: &Activity,
        roster: Option<&AttendanceRoster>,
        enrollments: &[Enrollment],
        default_hours: f64,
    ) -> Self {
        let attended = roster.map_or(0, |r| r.count(AttendanceOutcome::Presente));
        let confirmed = enrollments
            .iter()
            .filter(|e| e.activity_id == activity.id && e.is_active())
            .count() as u32;
        let duration = activity.duration_hours().unwrap_or(default_hours);

        Self {
            hours_total: attended as f64 * duration,
            volunteers_attended: attended,
            volunteers_confirmed: confirmed,
        }
    }
}

impl ImpactReport {
    pub fn id_for(activity_id: &str) -> String {
        format!("report_{}", activity_id)
    }

    /// First report for an activity: computed metrics, then overrides.
    pub fn generate(
        activity_id: &str,
        metrics: ReportMetrics,
        overrides: &ReportOverrides,
        now: DateTime<Utc>,
    ) -> Self {
        let mut report = Self {
            id: Self::id_for(activity_id),
            activity_id: activity_id.to_string(),
            hours_total: metrics.hours_total,
            hours_overridden: false,
            beneficiaries: None,
            volunteers_attended: metrics.volunteers_attended,
            volunteers_confirmed: metrics.volunteers_confirmed,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        report.apply(overrides, None, now);
        report
    }

    /// Merge an update into an existing report.
    ///
    /// `metrics` is only supplied when a recompute was requested; manually
    /// set hours survive a recompute unless overridden again.
    pub fn apply(
        &mut self,
        overrides: &ReportOverrides,
        metrics: Option<ReportMetrics>,
        now: DateTime<Utc>,
    ) {
        if let Some(metrics) = metrics {
            self.volunteers_attended = metrics.volunteers_attended;
            self.volunteers_confirmed = metrics.volunteers_confirmed;
            if !self.hours_overridden {
                self.hours_total = metrics.hours_total;
            }
        }
        if let Some(hours) = overrides.hours_total {
            self.hours_total = hours;
            self.hours_overridden = true;
        }
        if let Some(beneficiaries) = overrides.beneficiaries {
            self.beneficiaries = Some(beneficiaries);
        }
        if let Some(notes) = &overrides.notes {
            let notes = notes.trim();
            self.notes = (!notes.is_empty()).then(|| notes.to_string());
        }
        self.updated_at = now;
    }
}
