use std::collections::BTreeMap;

use crate::schemas::exam::{AnswerValue, Question};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuestionResult {
    pub(crate) question_id: String,
    pub(crate) is_correct: bool,
    pub(crate) points: u32,
    pub(crate) earned_points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScoreOutcome {
    pub(crate) percentage: u8,
    pub(crate) total_points: u32,
    pub(crate) earned_points: u32,
    pub(crate) correct_answers: usize,
    pub(crate) per_question: Vec<QuestionResult>,
}

/// Grades an answer map against a question set. All-or-nothing per
/// question, no partial credit.
pub(crate) fn score(
    questions: &[Question],
    answers: &BTreeMap<String, AnswerValue>,
) -> ScoreOutcome {
    let mut total_points = 0u32;
    let mut earned_points = 0u32;
    let mut correct_answers = 0usize;
    let mut per_question = Vec::with_capacity(questions.len());

    for question in questions {
        total_points += question.points;

        let correct = is_correct(question, answers.get(&question.id));
        let earned = if correct { question.points } else { 0 };
        earned_points += earned;
        if correct {
            correct_answers += 1;
        }

        per_question.push(QuestionResult {
            question_id: question.id.clone(),
            is_correct: correct,
            points: question.points,
            earned_points: earned,
        });
    }

    ScoreOutcome {
        percentage: percentage(earned_points, total_points),
        total_points,
        earned_points,
        correct_answers,
        per_question,
    }
}

/// The single correctness comparator used at submission and during replay.
/// Scalar answers compare case-insensitively after trimming; collection
/// answers compare as sets of equal size.
pub(crate) fn is_correct(question: &Question, answer: Option<&AnswerValue>) -> bool {
    let Some(correct) = question.correct_answer.as_ref() else {
        return false;
    };
    let Some(answer) = answer else {
        return false;
    };
    if answer.is_empty() {
        return false;
    }

    match (correct, answer) {
        (AnswerValue::Many(expected), AnswerValue::Many(supplied)) => {
            supplied.len() == expected.len()
                && supplied.iter().all(|value| expected.contains(value))
        }
        (AnswerValue::Text(expected), AnswerValue::Text(supplied)) => {
            normalize(supplied) == normalize(expected)
        }
        _ => false,
    }
}

pub(crate) fn percentage(earned_points: u32, total_points: u32) -> u8 {
    if total_points == 0 {
        return 0;
    }
    ((f64::from(earned_points) / f64::from(total_points)) * 100.0).round() as u8
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
