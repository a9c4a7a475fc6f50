// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{FirestoreDb, InsertOutcome, Modified};

/// Collection names as constants.
pub mod collections {
    pub const ACTIVITIES: &str = "activities";
    /// Keyed by `Enrollment::key(activity_id, student_id)`
    pub const ENROLLMENTS: &str = "enrollments";
    /// Keyed by `AttendanceRoster::id_for(activity_id)`
    pub const ROSTERS: &str = "attendance_rosters";
    /// Keyed by `ImpactReport::id_for(activity_id)`
    pub const REPORTS: &str = "impact_reports";
}
