use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::core::time::{
    deserialize_offset_datetime_flexible, serialize_offset_datetime,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    FillBlank,
    Essay,
    Matching,
}

impl QuestionKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple-choice",
            QuestionKind::TrueFalse => "true-false",
            QuestionKind::FillBlank => "fill-blank",
            QuestionKind::Essay => "essay",
            QuestionKind::Matching => "matching",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A student answer, either a single value or the selection set of a
/// matching question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum AnswerValue {
    Text(String),
    Many(Vec<String>),
}

impl AnswerValue {
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(value) => value.is_empty(),
            AnswerValue::Many(values) => values.is_empty(),
        }
    }
}

impl Default for AnswerValue {
    fn default() -> Self {
        AnswerValue::Text(String::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub(crate) struct Question {
    #[validate(length(min = 1, message = "question id must not be empty"))]
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) kind: QuestionKind,
    #[validate(length(min = 1, message = "question prompt must not be empty"))]
    pub(crate) question: String,
    #[serde(default)]
    pub(crate) options: Option<Vec<String>>,
    #[serde(default)]
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: Option<AnswerValue>,
    #[validate(range(min = 1, message = "points must be positive"))]
    pub(crate) points: u32,
    #[serde(default)]
    #[serde(alias = "timeLimit")]
    pub(crate) time_limit: Option<u32>,
    #[serde(default)]
    #[serde(alias = "allowCalculator")]
    pub(crate) allow_calculator: Option<bool>,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
    #[serde(default)]
    pub(crate) difficulty: Option<Difficulty>,
    #[serde(default)]
    pub(crate) category: Option<String>,
    #[serde(default)]
    pub(crate) image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub(crate) struct ExamSchedule {
    pub(crate) id: String,
    #[serde(
        alias = "startDate",
        serialize_with = "serialize_offset_datetime",
        deserialize_with = "deserialize_offset_datetime_flexible"
    )]
    pub(crate) start_date: OffsetDateTime,
    #[serde(
        alias = "endDate",
        serialize_with = "serialize_offset_datetime",
        deserialize_with = "deserialize_offset_datetime_flexible"
    )]
    pub(crate) end_date: OffsetDateTime,
    #[serde(default = "default_timezone")]
    pub(crate) timezone: String,
    #[serde(default)]
    #[serde(alias = "allowEarlyStart")]
    pub(crate) allow_early_start: bool,
    #[serde(default)]
    #[serde(alias = "allowLateSubmission")]
    pub(crate) allow_late_submission: bool,
    #[serde(default)]
    #[serde(alias = "lateSubmissionPenalty")]
    #[validate(range(max = 100, message = "late_submission_penalty must be at most 100"))]
    pub(crate) late_submission_penalty: u8,
    #[serde(default)]
    #[serde(alias = "maxLateMinutes")]
    pub(crate) max_late_minutes: u32,
    #[serde(default = "default_enabled_true")]
    #[serde(alias = "isActive")]
    pub(crate) is_active: bool,
    #[serde(default)]
    #[serde(alias = "createdAt")]
    pub(crate) created_at: Option<String>,
    #[serde(default)]
    #[serde(alias = "updatedAt")]
    pub(crate) updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub(crate) struct ExamConfig {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(alias = "timeLimit")]
    #[validate(range(min = 1, message = "time_limit must be positive"))]
    pub(crate) time_limit: u32,
    #[serde(alias = "totalQuestions")]
    #[validate(range(min = 1, message = "total_questions must be positive"))]
    pub(crate) total_questions: usize,
    #[serde(alias = "passingScore")]
    #[validate(range(max = 100, message = "passing_score must be at most 100"))]
    pub(crate) passing_score: u8,
    #[serde(default)]
    #[serde(alias = "allowCalculator")]
    pub(crate) allow_calculator: bool,
    #[serde(default = "default_enabled_true")]
    #[serde(alias = "allowBackNavigation")]
    pub(crate) allow_back_navigation: bool,
    #[serde(default)]
    #[serde(alias = "randomizeQuestions")]
    pub(crate) randomize_questions: bool,
    #[serde(default)]
    #[serde(alias = "randomizeOptions")]
    pub(crate) randomize_options: bool,
    #[serde(default)]
    #[serde(alias = "showResultsImmediately")]
    pub(crate) show_results_immediately: bool,
    #[serde(default = "default_max_attempts")]
    #[serde(alias = "maxAttempts")]
    #[validate(range(min = 1, message = "max_attempts must be positive"))]
    pub(crate) max_attempts: u32,
    #[serde(default)]
    #[serde(alias = "enableTabSwitchDetection")]
    pub(crate) enable_tab_switch_detection: bool,
    #[serde(default)]
    #[serde(alias = "enableFullScreenMode")]
    pub(crate) enable_full_screen_mode: bool,
    #[serde(default)]
    #[serde(alias = "enableCopyPasteProtection")]
    pub(crate) enable_copy_paste_protection: bool,
    #[serde(default)]
    #[serde(alias = "enableRightClickProtection")]
    pub(crate) enable_right_click_protection: bool,
    #[serde(default = "default_enabled_true")]
    #[serde(alias = "autoSubmitOnTimeExpiry")]
    pub(crate) auto_submit_on_time_expiry: bool,
    #[serde(default = "default_enabled_true")]
    #[serde(alias = "showTimeWarnings")]
    pub(crate) show_time_warnings: bool,
    #[serde(default = "default_time_warning_intervals")]
    #[serde(alias = "timeWarningIntervals")]
    pub(crate) time_warning_intervals: Vec<u32>,
    #[serde(default = "default_enabled_true")]
    #[serde(alias = "enableAutoSave")]
    pub(crate) enable_auto_save: bool,
    #[serde(default = "default_auto_save_interval")]
    #[serde(alias = "autoSaveInterval")]
    #[validate(range(min = 1, message = "auto_save_interval must be positive"))]
    pub(crate) auto_save_interval: u32,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) schedule: Option<ExamSchedule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub(crate) struct ExamData {
    #[validate(nested)]
    pub(crate) config: ExamConfig,
    #[validate(nested)]
    pub(crate) questions: Vec<Question>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_enabled_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    1
}

// Warning thresholds are minutes before expiry.
fn default_time_warning_intervals() -> Vec<u32> {
    vec![5, 1]
}

fn default_auto_save_interval() -> u32 {
    30
}
