// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Data models for the application.

pub mod activity;
pub mod dashboard;
pub mod enrollment;
pub mod report;
pub mod roster;
pub mod user;

pub use activity::{
    promote_interests, Activity, ActivityFilter, ActivityPatch, ActivityStatus, Category,
    Contact, Location, LocationInput, Modality, NewActivity,
};
pub use dashboard::AdminSummary;
pub use enrollment::{Enrollment, EnrollmentStatus, StatusChange};
pub use report::{ImpactReport, ReportMetrics, ReportOverrides};
pub use roster::{AttendanceOutcome, AttendanceRoster, AttendanceUpdate, RosterEntry};
pub use user::{Role, StudentSummary};
