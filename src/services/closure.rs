// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Closure workflow: the only path that moves an activity to `closed`.

use chrono::Utc;
use serde::Serialize;

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::activity::validate_closure_reason;
use crate::models::Activity;
use crate::services::notifier::{Notification, NotificationService};

#[derive(Debug, Clone, Serialize)]
pub struct ClosureOutcome {
    pub activity: Activity,
    pub notified_count: usize,
}

#[derive(Clone)]
pub struct ClosureWorkflow {
    db: FirestoreDb,
    notifier: NotificationService,
}

impl ClosureWorkflow {
    pub fn new(db: FirestoreDb, notifier: NotificationService) -> Self {
        Self { db, notifier }
    }

    /// Close an activity and address its pending enrollments.
    ///
    /// The status check and the writes share one transaction, so of two
    /// concurrent closers exactly one succeeds and the other gets
    /// `AlreadyClosed`. State is committed before any notification goes out;
    /// delivery failures never undo the closure.
    pub async fn close(&self, activity_id: &str, reason: &str) -> Result<ClosureOutcome> {
        validate_closure_reason(reason)?;

        let now = Utc::now();
        let (activity, addressed) = self
            .db
            .close_activity_atomic(activity_id, |activity, enrollments| {
                activity.close(reason, now)?;
                enrollments.retain_mut(|e| e.address_on_closure(now));
                Ok(())
            })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {}", activity_id)))?;

        tracing::info!(
            activity_id,
            reason = activity.closure_reason.as_deref().unwrap_or_default(),
            notified = addressed.len(),
            "Activity closed"
        );

        self.notifier.notify_all(
            addressed
                .iter()
                .map(|e| Notification::activity_closed(&activity, e)),
        );

        Ok(ClosureOutcome {
            notified_count: addressed.len(),
            activity,
        })
    }
}
