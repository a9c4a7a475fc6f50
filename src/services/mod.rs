// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Services module - business logic layer.

pub mod admin;
pub mod attendance;
pub mod closure;
pub mod export;
pub mod ledger;
pub mod notifier;
pub mod registry;
pub mod reports;

pub use admin::AdminPanel;
pub use attendance::{AttendanceService, RosterLocks};
pub use closure::{ClosureOutcome, ClosureWorkflow};
pub use export::ExportService;
pub use ledger::EnrollmentLedger;
pub use notifier::{Notification, NotificationService};
pub use registry::ActivityRegistry;
pub use reports::ReportService;
