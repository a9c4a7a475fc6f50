// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Attendance rosters: creation from the ledger, refresh and outcome updates.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::{FirestoreDb, InsertOutcome};
use crate::error::{AppError, Result};
use crate::models::{AttendanceRoster, AttendanceUpdate};
use crate::services::ActivityRegistry;

/// Per-roster mutex, shared across requests through `AppState`.
pub type RosterLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Exclusive hold on one roster. Dropping it releases the mutex and removes
/// the map entry when no other request holds or awaits it.
struct RosterGuard {
    locks: RosterLocks,
    roster_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RosterGuard {
    fn drop(&mut self) {
        // The owned guard keeps an Arc alive; release it before counting.
        self.guard.take();
        self.locks
            .remove_if(&self.roster_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

async fn lock_roster(locks: &RosterLocks, roster_id: &str) -> RosterGuard {
    let lock = locks
        .entry(roster_id.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();
    RosterGuard {
        locks: locks.clone(),
        roster_id: roster_id.to_string(),
        guard: Some(lock.lock_owned().await),
    }
}

#[derive(Clone)]
pub struct AttendanceService {
    db: FirestoreDb,
    registry: ActivityRegistry,
    locks: RosterLocks,
}

impl AttendanceService {
    pub fn new(db: FirestoreDb, locks: RosterLocks) -> Self {
        Self {
            registry: ActivityRegistry::new(db.clone()),
            db,
            locks,
        }
    }

    async fn load(&self, roster_id: &str) -> Result<AttendanceRoster> {
        self.db
            .get_roster(roster_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Roster {}", roster_id)))
    }

    /// Get-or-create the roster of an activity.
    pub async fn create_roster(&self, activity_id: &str) -> Result<AttendanceRoster> {
        self.registry.get(activity_id).await?;

        let enrollments = self.db.list_enrollments_for_activity(activity_id).await?;
        let roster = AttendanceRoster::from_enrollments(activity_id, &enrollments, Utc::now());

        match self.db.create_roster(&roster).await? {
            InsertOutcome::Created(created) => {
                tracing::info!(
                    activity_id,
                    entries = created.entries.len(),
                    "Attendance roster created"
                );
                Ok(created)
            }
            InsertOutcome::AlreadyExists(existing) => {
                tracing::debug!(activity_id, "Attendance roster already exists");
                Ok(existing)
            }
        }
    }

    pub async fn get_for_activity(&self, activity_id: &str) -> Result<AttendanceRoster> {
        self.load(&AttendanceRoster::id_for(activity_id)).await
    }

    /// Append newly enrolled students; recorded outcomes are kept.
    pub async fn refresh_roster(&self, roster_id: &str) -> Result<AttendanceRoster> {
        let _guard = lock_roster(&self.locks, roster_id).await;

        let mut roster = self.load(roster_id).await?;
        let enrollments = self
            .db
            .list_enrollments_for_activity(&roster.activity_id)
            .await?;
        let added = roster.refresh(&enrollments, Utc::now());
        self.db.set_roster(&roster).await?;

        tracing::info!(roster_id, added, "Attendance roster refreshed");
        Ok(roster)
    }

    /// Apply outcomes as one batch; an unknown student rejects the whole batch.
    pub async fn update_attendance(
        &self,
        roster_id: &str,
        updates: &[AttendanceUpdate],
    ) -> Result<AttendanceRoster> {
        let _guard = lock_roster(&self.locks, roster_id).await;

        let mut roster = self.load(roster_id).await?;
        roster.apply_updates(updates, Utc::now())?;
        self.db.set_roster(&roster).await?;

        tracing::info!(roster_id, updated = updates.len(), "Attendance recorded");
        Ok(roster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holders(locks: &RosterLocks, roster_id: &str) -> usize {
        locks
            .get(roster_id)
            .map_or(0, |lock| Arc::strong_count(lock.value()))
    }

    #[tokio::test]
    async fn test_roster_lock_entry_removed_after_use() {
        let locks = RosterLocks::default();
        {
            let _guard = lock_roster(&locks, "r1").await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_roster_lock_entry_kept_while_awaited() {
        let locks = RosterLocks::default();
        let first = lock_roster(&locks, "r1").await;

        let waiter = tokio::spawn({
            let locks = locks.clone();
            async move {
                let _guard = lock_roster(&locks, "r1").await;
            }
        });
        // Map, first holder and the queued waiter
        while holders(&locks, "r1") < 3 {
            tokio::task::yield_now().await;
        }

        drop(first);
        assert!(locks.contains_key("r1"));

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_roster_locks_are_independent() {
        let locks = RosterLocks::default();
        let _a = lock_roster(&locks, "r1").await;
        let b = lock_roster(&locks, "r2").await;
        assert_eq!(locks.len(), 2);

        drop(b);
        assert_eq!(locks.len(), 1);
        assert!(locks.contains_key("r1"));
    }
}
