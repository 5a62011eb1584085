use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use validator::Validate;

use crate::schemas::attempt::SubmissionBundle;
use crate::schemas::exam::{AnswerValue, ExamData, Question, QuestionKind};

#[derive(Debug, Error)]
pub(crate) enum ExamDefinitionError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("invalid definition: {0}")]
    Constraint(String),
    #[error("duplicate question id {0}")]
    DuplicateQuestionId(String),
    #[error("question {id}: {reason}")]
    QuestionShape { id: String, reason: String },
    #[error("schedule end date must be after start date")]
    ScheduleOrder,
}

pub(crate) fn load_exam(path: &Path) -> Result<ExamData, ExamDefinitionError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ExamDefinitionError::Read { path: path.to_path_buf(), source })?;
    let exam: ExamData = serde_json::from_str(&raw)
        .map_err(|source| ExamDefinitionError::Parse { path: path.to_path_buf(), source })?;
    validate_exam(&exam)?;
    Ok(exam)
}

pub(crate) fn load_bundle(path: &Path) -> Result<SubmissionBundle, ExamDefinitionError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ExamDefinitionError::Read { path: path.to_path_buf(), source })?;
    let bundle: SubmissionBundle = serde_json::from_str(&raw)
        .map_err(|source| ExamDefinitionError::Parse { path: path.to_path_buf(), source })?;
    bundle.validate().map_err(|e| ExamDefinitionError::Constraint(e.to_string()))?;
    Ok(bundle)
}

/// Structural checks beyond field-level constraints. A definition that
/// passes here can be scored without shape surprises later.
pub(crate) fn validate_exam(exam: &ExamData) -> Result<(), ExamDefinitionError> {
    exam.validate().map_err(|e| ExamDefinitionError::Constraint(e.to_string()))?;

    let mut seen = HashSet::new();
    for question in &exam.questions {
        if !seen.insert(question.id.as_str()) {
            return Err(ExamDefinitionError::DuplicateQuestionId(question.id.clone()));
        }
        validate_question(question)?;
    }

    if let Some(schedule) = &exam.config.schedule {
        if schedule.end_date <= schedule.start_date {
            return Err(ExamDefinitionError::ScheduleOrder);
        }
    }

    Ok(())
}

fn validate_question(question: &Question) -> Result<(), ExamDefinitionError> {
    let shape = |reason: String| ExamDefinitionError::QuestionShape {
        id: question.id.clone(),
        reason,
    };

    match question.kind {
        QuestionKind::MultipleChoice => {
            let options = question.options.as_deref().unwrap_or_default();
            if options.len() < 2 {
                return Err(shape("multiple-choice requires at least two options".to_string()));
            }
            match &question.correct_answer {
                Some(AnswerValue::Text(value)) if options.contains(value) => Ok(()),
                Some(AnswerValue::Text(value)) => {
                    Err(shape(format!("correct answer '{value}' is not one of the options")))
                }
                Some(AnswerValue::Many(_)) => Err(shape(format!(
                    "{} requires a single correct answer",
                    question.kind.as_str()
                ))),
                None => Err(shape("multiple-choice requires a correct answer".to_string())),
            }
        }
        QuestionKind::TrueFalse => match &question.correct_answer {
            Some(AnswerValue::Text(value))
                if value.trim().eq_ignore_ascii_case("true")
                    || value.trim().eq_ignore_ascii_case("false") =>
            {
                Ok(())
            }
            Some(_) => Err(shape("true-false answer must be 'true' or 'false'".to_string())),
            None => Err(shape("true-false requires a correct answer".to_string())),
        },
        // Answerless fill-blank is valid; it simply never scores as correct.
        QuestionKind::FillBlank => match question.correct_answer {
            None | Some(AnswerValue::Text(_)) => Ok(()),
            Some(AnswerValue::Many(_)) => Err(shape(format!(
                "{} requires a single correct answer",
                question.kind.as_str()
            ))),
        },
        QuestionKind::Essay => match question.correct_answer {
            None => Ok(()),
            Some(_) => Err(shape("essay questions must not define a correct answer".to_string())),
        },
        QuestionKind::Matching => {
            let options = question.options.as_deref().unwrap_or_default();
            if options.len() < 2 {
                return Err(shape("matching requires at least two options".to_string()));
            }
            match &question.correct_answer {
                Some(AnswerValue::Many(values)) if !values.is_empty() => {
                    for value in values {
                        if !options.contains(value) {
                            return Err(shape(format!(
                                "correct answer '{value}' is not one of the options"
                            )));
                        }
                    }
                    Ok(())
                }
                _ => Err(shape("matching requires a non-empty list of correct answers".to_string())),
            }
        }
    }
}
