// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Admin dashboard rollups.
//!
//! Everything here is computed on read from the three stores; nothing is
//! persisted. Counters use `BTreeMap` so the JSON keys come out sorted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::{
    Activity, ActivityStatus, AttendanceOutcome, AttendanceRoster, Enrollment, EnrollmentStatus,
    StudentSummary,
};
use crate::time_utils::month_key;

/// Title shown for rows whose activity no longer exists.
pub const DELETED_ACTIVITY_TITLE: &str = "(deleted activity)";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub activities: u32,
    pub active_activities: u32,
    pub closed_activities: u32,
    pub enrollments: u32,
    pub active_enrollments: u32,
    pub rosters: u32,
    pub attendance_present: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRank {
    pub activity_id: String,
    pub title: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentEnrollment {
    pub enrollment_id: String,
    pub activity_id: String,
    pub activity_title: String,
    pub student: StudentSummary,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentAttendance {
    pub activity_id: String,
    pub activity_title: String,
    pub student: StudentSummary,
    pub outcome: AttendanceOutcome,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminSummary {
    pub generated_at: DateTime<Utc>,
    pub totals: Totals,
    pub activities_by_status: BTreeMap<String, u32>,
    pub activities_by_category: BTreeMap<String, u32>,
    /// Keyed by start month ("YYYY-MM")
    pub activities_by_month: BTreeMap<String, u32>,
    pub enrollments_by_status: BTreeMap<String, u32>,
    /// Keyed by enrollment month ("YYYY-MM")
    pub enrollments_by_month: BTreeMap<String, u32>,
    pub top_by_enrollment: Vec<ActivityRank>,
    pub top_by_attendance: Vec<ActivityRank>,
    pub recent_enrollments: Vec<RecentEnrollment>,
    pub recent_attendance: Vec<RecentAttendance>,
}

fn bump(map: &mut BTreeMap<String, u32>, key: impl Into<String>) {
    *map.entry(key.into()).or_insert(0) += 1;
}

struct Titles<'a>(HashMap<&'a str, &'a str>);

impl<'a> Titles<'a> {
    fn new(activities: &'a [Activity]) -> Self {
        Self(
            activities
                .iter()
                .map(|a| (a.id.as_str(), a.title.as_str()))
                .collect(),
        )
    }

    fn get(&self, activity_id: &str) -> String {
        self.0
            .get(activity_id)
            .copied()
            .unwrap_or(DELETED_ACTIVITY_TITLE)
            .to_string()
    }
}

/// Count desc, then title, then id, truncated to `top_n`. Zero counts are dropped.
fn rank(counts: HashMap<&str, u32>, titles: &Titles<'_>, top_n: usize) -> Vec<ActivityRank> {
    let mut ranked: Vec<ActivityRank> = counts
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(id, count)| ActivityRank {
            activity_id: id.to_string(),
            title: titles.get(id),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.activity_id.cmp(&b.activity_id))
    });
    ranked.truncate(top_n);
    ranked
}

impl AdminSummary {
    pub fn build(
        activities: &[Activity],
        enrollments: &[Enrollment],
        rosters: &[AttendanceRoster],
        top_n: usize,
        recent_n: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let titles = Titles::new(activities);
        let mut totals = Totals {
            activities: activities.len() as u32,
            enrollments: enrollments.len() as u32,
            rosters: rosters.len() as u32,
            ..Default::default()
        };

        let mut activities_by_status = BTreeMap::new();
        let mut activities_by_category = BTreeMap::new();
        let mut activities_by_month = BTreeMap::new();
        for activity in activities {
            match activity.status {
                ActivityStatus::Active => totals.active_activities += 1,
                ActivityStatus::Closed => totals.closed_activities += 1,
                ActivityStatus::Completed => {}
            }
            bump(&mut activities_by_status, activity.status.as_str());
            bump(&mut activities_by_category, activity.category.as_str());
            bump(&mut activities_by_month, month_key(&activity.start));
        }

        let mut enrollments_by_status = BTreeMap::new();
        let mut enrollments_by_month = BTreeMap::new();
        let mut enrollment_counts: HashMap<&str, u32> = HashMap::new();
        for enrollment in enrollments {
            bump(&mut enrollments_by_status, enrollment.status.as_str());
            bump(&mut enrollments_by_month, month_key(&enrollment.created_at));
            if enrollment.is_active() {
                totals.active_enrollments += 1;
                *enrollment_counts
                    .entry(enrollment.activity_id.as_str())
                    .or_insert(0) += 1;
            }
        }

        let mut attendance_counts: HashMap<&str, u32> = HashMap::new();
        let mut recorded = Vec::new();
        for roster in rosters {
            let present = roster.count(AttendanceOutcome::Presente);
            totals.attendance_present += present;
            attendance_counts.insert(roster.activity_id.as_str(), present);
            for entry in &roster.entries {
                if let Some(at) = entry.recorded_at {
                    recorded.push((roster.activity_id.as_str(), entry, at));
                }
            }
        }

        let mut newest: Vec<&Enrollment> = enrollments.iter().collect();
        newest.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        let recent_enrollments = newest
            .into_iter()
            .take(recent_n)
            .map(|e| RecentEnrollment {
                enrollment_id: e.id.clone(),
                activity_id: e.activity_id.clone(),
                activity_title: titles.get(&e.activity_id),
                student: e.student(),
                status: e.status,
                created_at: e.created_at,
            })
            .collect();

        recorded.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(b.0)));
        let recent_attendance = recorded
            .into_iter()
            .take(recent_n)
            .map(|(activity_id, entry, recorded_at)| RecentAttendance {
                activity_id: activity_id.to_string(),
                activity_title: titles.get(activity_id),
                student: entry.student.clone(),
                outcome: entry.outcome,
                recorded_at,
            })
            .collect();

        Self {
            generated_at: now,
            totals,
            activities_by_status,
            activities_by_category,
            activities_by_month,
            enrollments_by_status,
            enrollments_by_month,
            top_by_enrollment: rank(enrollment_counts, &titles, top_n),
            top_by_attendance: rank(attendance_counts, &titles, top_n),
            recent_enrollments,
            recent_attendance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceUpdate, NewActivity};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn activity(id: &str, title: &str, category: &str, start: &str) -> Activity {
        let request: NewActivity = serde_json::from_value(serde_json::json!({
            "title": title,
            "description": "desc",
            "category": category,
            "modality": "virtual",
            "start": start,
            "location": {"venue": "Online", "address": "-", "district": "-"}
        }))
        .unwrap();
        request.into_activity(id.to_string(), now()).unwrap()
    }

    fn enroll(activity: &str, student: &str, minutes: i64) -> Enrollment {
        Enrollment::new(
            activity,
            &StudentSummary::new(student),
            None,
            now() + Duration::minutes(minutes),
        )
    }

    #[test]
    fn test_counts_and_rankings() {
        let mut closed = activity("b", "Beta", "children", "2025-06-02T10:00:00Z");
        closed.close("lluvia", now()).unwrap();
        let activities = vec![
            activity("a", "Alfa", "environment", "2025-05-10T10:00:00Z"),
            closed,
            activity("c", "Gamma", "environment", "2025-05-20T10:00:00Z"),
        ];

        let mut cancelled = enroll("a", "s3", 3);
        cancelled.cancel(now());
        let enrollments = vec![
            enroll("a", "s1", 1),
            enroll("a", "s2", 2),
            cancelled,
            enroll("b", "s1", 4),
            enroll("c", "s4", 5),
        ];

        let summary = AdminSummary::build(&activities, &enrollments, &[], 5, 10, now());

        assert_eq!(summary.totals.activities, 3);
        assert_eq!(summary.totals.active_activities, 2);
        assert_eq!(summary.totals.closed_activities, 1);
        assert_eq!(summary.totals.enrollments, 5);
        assert_eq!(summary.totals.active_enrollments, 4);
        assert_eq!(summary.activities_by_category["environment"], 2);
        assert_eq!(summary.activities_by_month["2025-05"], 2);
        assert_eq!(summary.activities_by_month["2025-06"], 1);
        assert_eq!(summary.activities_by_status["closed"], 1);
        assert_eq!(summary.enrollments_by_status["cancelado"], 1);

        let top: Vec<(&str, u32)> = summary
            .top_by_enrollment
            .iter()
            .map(|r| (r.activity_id.as_str(), r.count))
            .collect();
        // b and c tie on 1; "Beta" sorts before "Gamma".
        assert_eq!(top, vec![("a", 2), ("b", 1), ("c", 1)]);

        assert_eq!(summary.recent_enrollments[0].activity_id, "c");
        assert_eq!(summary.recent_enrollments.len(), 5);
    }

    #[test]
    fn test_deleted_activity_placeholder() {
        let enrollments = vec![enroll("gone", "s1", 0)];
        let summary = AdminSummary::build(&[], &enrollments, &[], 5, 10, now());

        assert_eq!(summary.top_by_enrollment[0].title, DELETED_ACTIVITY_TITLE);
        assert_eq!(summary.recent_enrollments[0].activity_title, DELETED_ACTIVITY_TITLE);
    }

    #[test]
    fn test_attendance_rollup() {
        let activities = vec![activity("a", "Alfa", "health", "2025-05-10T10:00:00Z")];
        let ledger = vec![enroll("a", "s1", 0), enroll("a", "s2", 0)];
        let mut roster = AttendanceRoster::from_enrollments("a", &ledger, now());
        roster
            .apply_updates(
                &[AttendanceUpdate {
                    student_id: "s2".to_string(),
                    outcome: AttendanceOutcome::Presente,
                }],
                now() + Duration::hours(1),
            )
            .unwrap();

        let summary = AdminSummary::build(&activities, &ledger, &[roster], 5, 10, now());

        assert_eq!(summary.totals.rosters, 1);
        assert_eq!(summary.totals.attendance_present, 1);
        assert_eq!(summary.top_by_attendance[0].count, 1);
        assert_eq!(summary.recent_attendance.len(), 1);
        assert_eq!(summary.recent_attendance[0].student.id, "s2");
    }

    #[test]
    fn test_limits_applied() {
        let activities: Vec<Activity> = (0..4)
            .map(|i| activity(&format!("a{i}"), &format!("T{i}"), "education", "2025-05-01"))
            .collect();
        let enrollments: Vec<Enrollment> = (0..4)
            .map(|i| enroll(&format!("a{i}"), "s1", i))
            .collect();

        let summary = AdminSummary::build(&activities, &enrollments, &[], 2, 3, now());
        assert_eq!(summary.top_by_enrollment.len(), 2);
        assert_eq!(summary.recent_enrollments.len(), 3);
    }
}
