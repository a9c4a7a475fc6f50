// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Souls: volunteer coordination backend.
//!
//! Students browse volunteer activities and enroll in them; administrators
//! manage activities, record attendance, close activities and produce impact
//! reports and dashboard rollups.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{
    ActivityRegistry, AdminPanel, AttendanceService, ClosureWorkflow, EnrollmentLedger,
    ExportService, NotificationService, ReportService, RosterLocks,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub notifier: NotificationService,
    pub registry: ActivityRegistry,
    pub ledger: EnrollmentLedger,
    pub attendance: AttendanceService,
    pub closure: ClosureWorkflow,
    pub reports: ReportService,
    pub admin: AdminPanel,
    pub export: ExportService,
}

impl AppState {
    /// Wire every service to the same store and notifier.
    pub fn new(config: Config, db: FirestoreDb) -> Self {
        let notifier = NotificationService::new(config.notification_webhook_url.clone());
        let roster_locks: RosterLocks = Default::default();

        Self {
            registry: ActivityRegistry::new(db.clone()),
            ledger: EnrollmentLedger::new(db.clone(), notifier.clone()),
            attendance: AttendanceService::new(db.clone(), roster_locks),
            closure: ClosureWorkflow::new(db.clone(), notifier.clone()),
            reports: ReportService::new(db.clone(), config.default_activity_hours),
            admin: AdminPanel::new(db.clone()),
            export: ExportService::new(db.clone()),
            notifier,
            config,
            db,
        }
    }
}
