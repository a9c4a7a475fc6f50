// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Activity registry: listing and admin CRUD over activities.

use chrono::Utc;

use crate::db::{FirestoreDb, Modified};
use crate::error::{AppError, Result};
use crate::models::{
    promote_interests, Activity, ActivityFilter, ActivityPatch, AttendanceRoster, ImpactReport,
    NewActivity,
};

#[derive(Clone)]
pub struct ActivityRegistry {
    db: FirestoreDb,
}

impl ActivityRegistry {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Filtered listing in insertion order; declared interests are promoted.
    pub async fn list(&self, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        let activities: Vec<Activity> = self
            .db
            .list_activities()
            .await?
            .into_iter()
            .filter(|a| filter.matches(a))
            .collect();

        Ok(promote_interests(activities, &filter.interest_categories()))
    }

    pub async fn get(&self, activity_id: &str) -> Result<Activity> {
        self.db
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {}", activity_id)))
    }

    pub async fn create(&self, request: NewActivity) -> Result<Activity> {
        let activity = request.into_activity(uuid::Uuid::new_v4().to_string(), Utc::now())?;
        self.db.create_activity(&activity).await?;

        tracing::info!(
            activity_id = %activity.id,
            category = activity.category.as_str(),
            "Activity created"
        );
        Ok(activity)
    }

    /// Patch validation runs before the lookup, so a bad body never touches storage.
    ///
    /// The patch is applied to the version read inside the write transaction,
    /// so a closure committed meanwhile is never overwritten.
    pub async fn update(&self, activity_id: &str, patch: ActivityPatch) -> Result<Activity> {
        patch.check()?;
        let now = Utc::now();
        let modified = self
            .db
            .modify_activity(activity_id, |activity| {
                patch.clone().apply_to(activity, now)?;
                Ok(true)
            })
            .await?;

        match modified {
            Modified::Missing => Err(AppError::NotFound(format!("Activity {}", activity_id))),
            Modified::Unchanged(activity) | Modified::Written(activity) => {
                tracing::info!(activity_id, "Activity updated");
                Ok(activity)
            }
        }
    }

    /// Delete an activity nothing references. Never cascades.
    pub async fn delete(&self, activity_id: &str) -> Result<()> {
        self.get(activity_id).await?;

        let active = self
            .db
            .list_enrollments_for_activity(activity_id)
            .await?
            .iter()
            .filter(|e| e.is_active())
            .count();
        if active > 0 {
            return Err(AppError::ActivityInUse(format!(
                "Activity {} has {} active enrollments",
                activity_id, active
            )));
        }
        if self
            .db
            .get_roster(&AttendanceRoster::id_for(activity_id))
            .await?
            .is_some()
        {
            return Err(AppError::ActivityInUse(format!(
                "Activity {} has an attendance roster",
                activity_id
            )));
        }
        if self
            .db
            .get_report(&ImpactReport::id_for(activity_id))
            .await?
            .is_some()
        {
            return Err(AppError::ActivityInUse(format!(
                "Activity {} has an impact report",
                activity_id
            )));
        }

        self.db.delete_activity(activity_id).await?;
        tracing::info!(activity_id, "Activity deleted");
        Ok(())
    }
}
