use std::path::Path;

use anyhow::{Context, Result};

use crate::services::exam_loader;

/// Fail-fast definition check: load, validate, and summarize an exam file.
/// Configuration errors surface here, before any session is offered.
pub(crate) fn run(exam_path: &Path) -> Result<()> {
    let exam = exam_loader::load_exam(exam_path)
        .with_context(|| format!("Exam definition rejected: {}", exam_path.display()))?;

    let total_points: u32 = exam.questions.iter().map(|question| question.points).sum();

    tracing::info!(
        title = %exam.config.title,
        questions = exam.questions.len(),
        total_points,
        time_limit_minutes = exam.config.time_limit,
        passing_score = exam.config.passing_score,
        scheduled = exam.config.schedule.is_some(),
        "Exam definition is valid"
    );

    println!("{}: OK ({} questions, {} points)", exam.config.title, exam.questions.len(), total_points);
    Ok(())
}
