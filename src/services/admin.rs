// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Admin dashboard: loads the stores and hands them to `AdminSummary::build`.

use chrono::Utc;

use crate::db::FirestoreDb;
use crate::error::Result;
use crate::models::AdminSummary;

pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_RECENT_N: usize = 10;
const MAX_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AdminPanel {
    db: FirestoreDb,
}

impl AdminPanel {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    pub async fn summary(&self, top_n: usize, recent_n: usize) -> Result<AdminSummary> {
        let (activities, enrollments, rosters) = tokio::try_join!(
            self.db.list_activities(),
            self.db.list_enrollments(),
            self.db.list_rosters(),
        )?;

        tracing::debug!(
            activities = activities.len(),
            enrollments = enrollments.len(),
            rosters = rosters.len(),
            "Building admin summary"
        );

        Ok(AdminSummary::build(
            &activities,
            &enrollments,
            &rosters,
            top_n.min(MAX_LIMIT),
            recent_n.min(MAX_LIMIT),
            Utc::now(),
        ))
    }
}
