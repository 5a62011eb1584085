use time::OffsetDateTime;

use crate::schemas::attempt::SubmissionBundle;
use crate::schemas::exam::ExamData;
use crate::schemas::report::{DetailedAnswer, ExamReport, ReportSummary};
use crate::services::scoring;

/// Rebuilds the graded view of a finished session from the definition and
/// the exported bundle. Pure: identical inputs reproduce identical grading.
pub(crate) fn build_report(
    exam: &ExamData,
    bundle: &SubmissionBundle,
    generated_at: OffsetDateTime,
) -> ExamReport {
    let outcome = scoring::score(&exam.questions, &bundle.attempt.answers);

    let detailed_answers: Vec<DetailedAnswer> = exam
        .questions
        .iter()
        .zip(&outcome.per_question)
        .map(|(question, result)| DetailedAnswer {
            question_id: question.id.clone(),
            question: question.question.clone(),
            student_answer: bundle
                .attempt
                .answers
                .get(&question.id)
                .cloned()
                .unwrap_or_default(),
            correct_answer: question.correct_answer.clone().unwrap_or_default(),
            is_correct: result.is_correct,
            points: result.points,
            earned_points: result.earned_points,
        })
        .collect();

    // The percentage here is the raw grade; any late penalty already sits in
    // attempt.score and attempt.penalty_applied.
    let summary = ReportSummary {
        total_questions: exam.questions.len(),
        answered_questions: bundle.attempt.answers.len(),
        correct_answers: outcome.correct_answers,
        total_points: outcome.total_points,
        earned_points: outcome.earned_points,
        percentage: outcome.percentage,
        passed: outcome.percentage >= exam.config.passing_score,
        time_spent: time_spent_seconds(bundle),
        violations: bundle.attempt.violations.clone(),
        tab_switch_count: bundle.attempt.tab_switch_count,
    };

    ExamReport {
        student_info: bundle.student_info.clone(),
        exam_config: exam.config.clone(),
        attempt: bundle.attempt.clone(),
        detailed_answers,
        summary,
        generated_at,
    }
}

fn time_spent_seconds(bundle: &SubmissionBundle) -> i64 {
    match bundle.attempt.end_time {
        Some(end) => (end - bundle.attempt.start_time).whole_seconds(),
        None => 0,
    }
}
