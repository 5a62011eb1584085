use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::core::time::format_display;
use crate::schemas::exam::ExamSchedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum AvailabilityStatus {
    NotStarted,
    Active,
    // Part of the status vocabulary but never produced by evaluation; the
    // closed state covers the post-window case.
    #[allow(dead_code)]
    Ended,
    LateSubmission,
    Closed,
}

/// Derived start/submit permissions for one instant. Recomputed on demand,
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Availability {
    pub(crate) is_available: bool,
    pub(crate) status: AvailabilityStatus,
    pub(crate) message: String,
    pub(crate) time_until_start: Option<u64>,
    pub(crate) time_until_end: Option<u64>,
    pub(crate) time_until_closure: Option<u64>,
    pub(crate) can_start: bool,
    pub(crate) can_submit: bool,
    pub(crate) penalty_percentage: Option<u8>,
}

pub(crate) fn evaluate(now: OffsetDateTime, schedule: Option<&ExamSchedule>) -> Availability {
    let Some(schedule) = schedule else {
        return Availability {
            is_available: true,
            status: AvailabilityStatus::Active,
            message: "Exam is available".to_string(),
            time_until_start: None,
            time_until_end: None,
            time_until_closure: None,
            can_start: true,
            can_submit: true,
            penalty_percentage: None,
        };
    };

    let start = schedule.start_date;
    let end = schedule.end_date;
    let late_end = end + Duration::minutes(i64::from(schedule.max_late_minutes));

    if now < start {
        Availability {
            is_available: false,
            status: AvailabilityStatus::NotStarted,
            message: format!("Exam will be available on {}", format_display(start)),
            time_until_start: Some(seconds_until(now, start)),
            time_until_end: None,
            time_until_closure: None,
            can_start: schedule.allow_early_start,
            can_submit: false,
            penalty_percentage: None,
        }
    } else if now <= end {
        Availability {
            is_available: true,
            status: AvailabilityStatus::Active,
            message: "Exam is currently available".to_string(),
            time_until_start: None,
            time_until_end: Some(seconds_until(now, end)),
            time_until_closure: None,
            can_start: true,
            can_submit: true,
            penalty_percentage: None,
        }
    } else if now <= late_end && schedule.allow_late_submission {
        Availability {
            is_available: true,
            status: AvailabilityStatus::LateSubmission,
            message: format!(
                "Late submission period. {}% penalty will be applied.",
                schedule.late_submission_penalty
            ),
            time_until_start: None,
            time_until_end: None,
            time_until_closure: Some(seconds_until(now, late_end)),
            can_start: false,
            can_submit: true,
            penalty_percentage: Some(schedule.late_submission_penalty),
        }
    } else {
        Availability {
            is_available: false,
            status: AvailabilityStatus::Closed,
            message: "Exam submission period has ended".to_string(),
            time_until_start: None,
            time_until_end: None,
            time_until_closure: None,
            can_start: false,
            can_submit: false,
            penalty_percentage: None,
        }
    }
}

pub(crate) fn format_countdown(seconds: u64) -> String {
    if seconds == 0 {
        return "00:00:00".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

fn seconds_until(now: OffsetDateTime, target: OffsetDateTime) -> u64 {
    let delta = (target - now).whole_seconds();
    if delta > 0 {
        delta as u64
    } else {
        0
    }
}
