// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Outbound notifications (enrollment confirmations, closure notices).
//!
//! Delivery is fire-and-forget: the caller has already committed its state
//! change, so a failed POST is logged and never propagated.

use serde::Serialize;

use crate::models::{Activity, Enrollment, StudentSummary};

/// Notification payload, tagged by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    EnrollmentConfirmed {
        activity_id: String,
        activity_title: String,
        student: StudentSummary,
    },
    ActivityClosed {
        activity_id: String,
        activity_title: String,
        reason: String,
        student: StudentSummary,
    },
}

impl Notification {
    pub fn enrollment_confirmed(activity: &Activity, enrollment: &Enrollment) -> Self {
        Notification::EnrollmentConfirmed {
            activity_id: activity.id.clone(),
            activity_title: activity.title.clone(),
            student: enrollment.student(),
        }
    }

    pub fn activity_closed(activity: &Activity, enrollment: &Enrollment) -> Self {
        Notification::ActivityClosed {
            activity_id: activity.id.clone(),
            activity_title: activity.title.clone(),
            reason: activity.closure_reason.clone().unwrap_or_default(),
            student: enrollment.student(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Notification::EnrollmentConfirmed { .. } => "enrollment_confirmed",
            Notification::ActivityClosed { .. } => "activity_closed",
        }
    }

    fn student_id(&self) -> &str {
        match self {
            Notification::EnrollmentConfirmed { student, .. }
            | Notification::ActivityClosed { student, .. } => &student.id,
        }
    }
}

/// Posts notifications to a webhook relay, or only logs them when none is configured.
#[derive(Clone)]
pub struct NotificationService {
    http: reqwest::Client,
    webhook_url: Option<String>,
}

impl NotificationService {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url,
        }
    }

    /// Queue a notification on a background task.
    pub fn notify(&self, notification: Notification) {
        let Some(url) = self.webhook_url.clone() else {
            tracing::info!(
                kind = notification.kind(),
                student_id = notification.student_id(),
                "Notification webhook not configured, skipping delivery"
            );
            return;
        };

        let http = self.http.clone();
        tokio::spawn(async move {
            if let Err(e) = deliver(&http, &url, &notification).await {
                tracing::warn!(
                    error = %e,
                    kind = notification.kind(),
                    student_id = notification.student_id(),
                    "Failed to deliver notification"
                );
            }
        });
    }

    pub fn notify_all(&self, notifications: impl IntoIterator<Item = Notification>) {
        for notification in notifications {
            self.notify(notification);
        }
    }
}

async fn deliver(
    http: &reqwest::Client,
    url: &str,
    notification: &Notification,
) -> anyhow::Result<()> {
    let response = http.post(url).json(notification).send().await?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("webhook returned {}", status);
    }
    tracing::debug!(kind = notification.kind(), "Notification delivered");
    Ok(())
}
