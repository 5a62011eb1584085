use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use time::OffsetDateTime;

use crate::core::config::Settings;
use crate::schemas::attempt::SubmissionBundle;
use crate::services::{exam_loader, report};

/// Offline report path: re-load a definition and a previously exported
/// bundle, rebuild the graded report, write it as JSON.
pub(crate) fn run(
    exam_path: &Path,
    answers_path: &Path,
    out: Option<&Path>,
    settings: &Settings,
) -> Result<()> {
    let exam = exam_loader::load_exam(exam_path)
        .with_context(|| format!("Exam definition rejected: {}", exam_path.display()))?;
    let bundle = exam_loader::load_bundle(answers_path)
        .with_context(|| format!("Submission bundle rejected: {}", answers_path.display()))?;

    let generated_at = OffsetDateTime::now_utc();
    let built = report::build_report(&exam, &bundle, generated_at);

    let out_path = match out {
        Some(path) => path.to_path_buf(),
        None => default_report_path(settings, &bundle, generated_at),
    };
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let payload = serde_json::to_string_pretty(&built)?;
    fs::write(&out_path, payload)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;

    tracing::info!(
        student = %built.student_info.name,
        percentage = built.summary.percentage,
        passed = built.summary.passed,
        out = %out_path.display(),
        "Report generated"
    );
    println!(
        "{}: {}% ({}) -> {}",
        built.student_info.name,
        built.summary.percentage,
        if built.summary.passed { "passed" } else { "failed" },
        out_path.display()
    );

    Ok(())
}

fn default_report_path(
    settings: &Settings,
    bundle: &SubmissionBundle,
    generated_at: OffsetDateTime,
) -> PathBuf {
    let student = bundle.student_info.name.replace(char::is_whitespace, "_");
    let date = generated_at.date();
    settings.report().report_dir.join(format!("{student}_report_{date}.json"))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use serde_json::json;

    use super::*;

    fn write_temp(dir: &Path, name: &str, value: &serde_json::Value) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(value.to_string().as_bytes()).unwrap();
        path
    }

    #[test]
    fn grades_a_bundle_end_to_end() {
        let dir = tempfile::tempdir().unwrap();

        let exam = json!({
            "config": {
                "title": "Algebra",
                "timeLimit": 45,
                "totalQuestions": 2,
                "passingScore": 50
            },
            "questions": [
                {
                    "id": "q1",
                    "type": "multiple-choice",
                    "question": "Pick one",
                    "options": ["A", "B"],
                    "correctAnswer": "B",
                    "points": 1
                },
                {
                    "id": "q2",
                    "type": "true-false",
                    "question": "Two is even",
                    "correctAnswer": "true",
                    "points": 1
                }
            ]
        });
        let bundle = json!({
            "studentInfo": { "name": "Ada Lovelace", "id": "s-42" },
            "examTitle": "Algebra",
            "examId": "Algebra",
            "attempt": {
                "id": "attempt-1",
                "examId": "Algebra",
                "studentId": "s-42",
                "startTime": "2025-03-01T09:00:00Z",
                "endTime": "2025-03-01T09:40:00Z",
                "answers": { "q1": "B", "q2": "false" },
                "score": 50,
                "status": "completed"
            },
            "questions": [],
            "submissionTime": "2025-03-01T09:40:00Z"
        });

        let exam_path = write_temp(dir.path(), "exam.json", &exam);
        let bundle_path = write_temp(dir.path(), "bundle.json", &bundle);
        let out_path = dir.path().join("report.json");

        let settings = crate::core::config::Settings::load().unwrap();
        run(&exam_path, &bundle_path, Some(&out_path), &settings).unwrap();

        let raw = fs::read_to_string(&out_path).unwrap();
        let report: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(report["summary"]["percentage"], json!(50));
        assert_eq!(report["summary"]["passed"], json!(true));
        assert_eq!(report["summary"]["time_spent"], json!(2400));
        assert_eq!(report["detailed_answers"].as_array().unwrap().len(), 2);
    }
}
