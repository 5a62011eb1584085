use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::core::time::{
    deserialize_offset_datetime_flexible, deserialize_option_offset_datetime_flexible,
    serialize_offset_datetime, serialize_option_offset_datetime,
};
use crate::schemas::exam::{AnswerValue, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum AttemptStatus {
    InProgress,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum ViolationKind {
    TabSwitch,
    FocusLoss,
    FullscreenExit,
    FullscreenDenied,
    Clipboard,
    Shortcut,
    ContextMenu,
}

/// One detected integrity breach. The kind drives counting and filtering;
/// the message is the student-facing text shown at detection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Violation {
    pub(crate) kind: ViolationKind,
    pub(crate) message: String,
    #[serde(
        serialize_with = "serialize_offset_datetime",
        deserialize_with = "deserialize_offset_datetime_flexible"
    )]
    pub(crate) at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub(crate) struct StudentInfo {
    #[validate(length(min = 1, message = "student name must not be empty"))]
    pub(crate) name: String,
    #[validate(length(min = 1, message = "student id must not be empty"))]
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ExamAttempt {
    pub(crate) id: String,
    #[serde(alias = "examId")]
    pub(crate) exam_id: String,
    #[serde(alias = "studentId")]
    pub(crate) student_id: String,
    #[serde(
        alias = "startTime",
        serialize_with = "serialize_offset_datetime",
        deserialize_with = "deserialize_offset_datetime_flexible"
    )]
    pub(crate) start_time: OffsetDateTime,
    #[serde(
        default,
        alias = "endTime",
        serialize_with = "serialize_option_offset_datetime",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) end_time: Option<OffsetDateTime>,
    #[serde(default)]
    pub(crate) answers: BTreeMap<String, AnswerValue>,
    #[serde(default)]
    pub(crate) score: Option<u8>,
    pub(crate) status: AttemptStatus,
    #[serde(default)]
    #[serde(alias = "tabSwitchCount")]
    pub(crate) tab_switch_count: u32,
    #[serde(default)]
    pub(crate) violations: Vec<Violation>,
    #[serde(default)]
    #[serde(alias = "isLateSubmission")]
    pub(crate) is_late_submission: bool,
    #[serde(default)]
    #[serde(alias = "penaltyApplied")]
    pub(crate) penalty_applied: u8,
}

/// The artifact exported when a session finishes. Carries the question set
/// the student actually saw so a grader can replay it without the original
/// definition file.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub(crate) struct SubmissionBundle {
    #[serde(alias = "studentInfo")]
    #[validate(nested)]
    pub(crate) student_info: StudentInfo,
    #[serde(alias = "examTitle")]
    pub(crate) exam_title: String,
    #[serde(alias = "examId")]
    pub(crate) exam_id: String,
    pub(crate) attempt: ExamAttempt,
    #[validate(nested)]
    pub(crate) questions: Vec<Question>,
    #[serde(
        alias = "submissionTime",
        serialize_with = "serialize_offset_datetime",
        deserialize_with = "deserialize_offset_datetime_flexible"
    )]
    pub(crate) submission_time: OffsetDateTime,
}
