// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Impact report generation and manual overrides.

use chrono::Utc;
use validator::Validate;

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{Activity, AttendanceRoster, ImpactReport, ReportMetrics, ReportOverrides};
use crate::services::ActivityRegistry;

#[derive(Clone)]
pub struct ReportService {
    db: FirestoreDb,
    registry: ActivityRegistry,
    default_hours: f64,
}

impl ReportService {
    pub fn new(db: FirestoreDb, default_hours: f64) -> Self {
        Self {
            registry: ActivityRegistry::new(db.clone()),
            db,
            default_hours,
        }
    }

    async fn metrics(&self, activity: &Activity) -> Result<ReportMetrics> {
        let roster = self
            .db
            .get_roster(&AttendanceRoster::id_for(&activity.id))
            .await?;
        let enrollments = self.db.list_enrollments_for_activity(&activity.id).await?;

        Ok(ReportMetrics::compute(
            activity,
            roster.as_ref(),
            &enrollments,
            self.default_hours,
        ))
    }

    /// Create the report on first call; afterwards only supplied fields change.
    pub async fn generate_or_update(
        &self,
        activity_id: &str,
        overrides: ReportOverrides,
    ) -> Result<ImpactReport> {
        overrides.validate()?;
        if overrides.hours_total.is_some_and(|h| !h.is_finite()) {
            return Err(AppError::validation(
                "hours_total",
                "hours must be a non-negative number",
            ));
        }

        let activity = self.registry.get(activity_id).await?;
        let now = Utc::now();
        let report = match self.db.get_report(&ImpactReport::id_for(activity_id)).await? {
            None => {
                let metrics = self.metrics(&activity).await?;
                ImpactReport::generate(activity_id, metrics, &overrides, now)
            }
            Some(mut report) => {
                let metrics = if overrides.recompute {
                    Some(self.metrics(&activity).await?)
                } else {
                    None
                };
                report.apply(&overrides, metrics, now);
                report
            }
        };

        self.db.set_report(&report).await?;
        tracing::info!(
            activity_id,
            hours_total = report.hours_total,
            attended = report.volunteers_attended,
            "Impact report saved"
        );
        Ok(report)
    }

    pub async fn get(&self, activity_id: &str) -> Result<ImpactReport> {
        self.db
            .get_report(&ImpactReport::id_for(activity_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report for activity {}", activity_id)))
    }
}
