use serde::Serialize;
use time::OffsetDateTime;

use crate::core::time::serialize_offset_datetime;
use crate::schemas::attempt::{ExamAttempt, StudentInfo, Violation};
use crate::schemas::exam::{AnswerValue, ExamConfig};

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DetailedAnswer {
    pub(crate) question_id: String,
    pub(crate) question: String,
    pub(crate) student_answer: AnswerValue,
    pub(crate) correct_answer: AnswerValue,
    pub(crate) is_correct: bool,
    pub(crate) points: u32,
    pub(crate) earned_points: u32,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReportSummary {
    pub(crate) total_questions: usize,
    pub(crate) answered_questions: usize,
    pub(crate) correct_answers: usize,
    pub(crate) total_points: u32,
    pub(crate) earned_points: u32,
    pub(crate) percentage: u8,
    pub(crate) passed: bool,
    pub(crate) time_spent: i64,
    pub(crate) violations: Vec<Violation>,
    pub(crate) tab_switch_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ExamReport {
    pub(crate) student_info: StudentInfo,
    pub(crate) exam_config: ExamConfig,
    pub(crate) attempt: ExamAttempt,
    pub(crate) detailed_answers: Vec<DetailedAnswer>,
    pub(crate) summary: ReportSummary,
    #[serde(serialize_with = "serialize_offset_datetime")]
    pub(crate) generated_at: OffsetDateTime,
}
