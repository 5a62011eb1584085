use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use time::{Duration, OffsetDateTime};

use crate::core::config::Settings;
use crate::core::time::deserialize_option_offset_datetime_flexible;
use crate::schemas::attempt::{StudentInfo, SubmissionBundle};
use crate::services::exam_loader;
use crate::session::controller::{SessionController, SessionEvent, SessionPhase};
use crate::session::runtime::DriverCommand;

/// A scripted session: driver commands pinned to second offsets from a
/// virtual base instant. With a fixed seed and base time the exported
/// bundle is fully deterministic.
#[derive(Debug, Deserialize)]
struct ReplayScript {
    #[serde(default)]
    seed: Option<u64>,
    #[serde(
        default,
        alias = "baseTime",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    base_time: Option<OffsetDateTime>,
    student: StudentInfo,
    events: Vec<ReplayStep>,
}

#[derive(Debug, Deserialize)]
struct ReplayStep {
    /// Seconds after the base instant at which the command runs.
    at: u64,
    #[serde(flatten)]
    action: DriverCommand,
}

pub(crate) fn run(
    exam_path: &Path,
    script_path: &Path,
    out: Option<&Path>,
    settings: &Settings,
) -> Result<()> {
    let exam = exam_loader::load_exam(exam_path)
        .with_context(|| format!("Exam definition rejected: {}", exam_path.display()))?;

    let raw = fs::read_to_string(script_path)
        .with_context(|| format!("Failed to read {}", script_path.display()))?;
    let script: ReplayScript = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid replay script: {}", script_path.display()))?;

    let bundle = replay(exam, script, settings.session().availability_poll_seconds)?;

    let payload = serde_json::to_string_pretty(&bundle)?;
    match out {
        Some(path) => {
            fs::write(path, payload)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(
                attempt = %bundle.attempt.id,
                score = bundle.attempt.score,
                out = %path.display(),
                "Replay completed"
            );
        }
        None => println!("{payload}"),
    }

    Ok(())
}

fn replay(
    exam: crate::schemas::exam::ExamData,
    script: ReplayScript,
    poll_seconds: u64,
) -> Result<SubmissionBundle> {
    let base = script.base_time.unwrap_or_else(OffsetDateTime::now_utc);

    let mut controller = SessionController::new(exam, script.seed, poll_seconds, base);
    if !controller.provide_identity(script.student) {
        return Err(anyhow!("replay could not establish student identity"));
    }

    let mut steps = script.events;
    steps.sort_by_key(|step| step.at);

    let mut clock = base;
    let mut elapsed = 0u64;
    let mut bundle = None;

    for step in steps {
        advance_to(&mut controller, &mut clock, &mut elapsed, step.at, &mut bundle);
        if bundle.is_some() {
            break;
        }
        apply(&mut controller, step.action, clock, &mut bundle);
        if bundle.is_some() || controller.phase() == SessionPhase::Abandoned {
            break;
        }
    }

    // A script without an explicit submit runs out the clock; auto-submit on
    // expiry produces the bundle. Bounded by the countdown, which stops
    // itself at zero however late the scripted start was.
    while bundle.is_none()
        && controller.phase() == SessionPhase::InProgress
        && controller.remaining_seconds() > 0
    {
        let target = elapsed + 1;
        advance_to(&mut controller, &mut clock, &mut elapsed, target, &mut bundle);
    }

    bundle.ok_or_else(|| anyhow!("replay finished without a completed attempt"))
}

fn advance_to(
    controller: &mut SessionController,
    clock: &mut OffsetDateTime,
    elapsed: &mut u64,
    target: u64,
    bundle: &mut Option<SubmissionBundle>,
) {
    while *elapsed < target && bundle.is_none() {
        *clock += Duration::seconds(1);
        *elapsed += 1;
        for event in controller.tick(*clock) {
            if let SessionEvent::Completed(completed) = event {
                *bundle = Some(*completed);
            }
        }
    }
}

fn apply(
    controller: &mut SessionController,
    action: DriverCommand,
    clock: OffsetDateTime,
    bundle: &mut Option<SubmissionBundle>,
) {
    match action {
        DriverCommand::Identity { student } => {
            controller.provide_identity(student);
        }
        DriverCommand::Start => {
            controller.start(clock);
        }
        DriverCommand::Answer { question_id, value } => {
            controller.record_answer(&question_id, value);
        }
        DriverCommand::GoTo { index } => {
            controller.go_to(index);
        }
        DriverCommand::Signal(signal) => {
            controller.observe_signal(&signal, clock);
        }
        DriverCommand::RequestFullscreen { granted } => {
            controller.request_fullscreen(granted, clock);
        }
        DriverCommand::Submit => {
            *bundle = controller.submit(clock);
        }
        DriverCommand::Abandon => {
            controller.abandon(clock);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schemas::exam::ExamData;

    fn exam() -> ExamData {
        serde_json::from_value(json!({
            "config": {
                "title": "Algebra",
                "timeLimit": 1,
                "totalQuestions": 2,
                "passingScore": 50,
                "enableTabSwitchDetection": true
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
        }))
        .expect("exam")
    }

    fn script(events: serde_json::Value) -> ReplayScript {
        serde_json::from_value(json!({
            "seed": 42,
            "base_time": "2025-03-01T09:00:00Z",
            "student": { "name": "Ada Lovelace", "id": "s-42" },
            "events": events,
        }))
        .expect("script")
    }

    #[test]
    fn scripted_session_produces_a_graded_bundle() {
        let script = script(json!([
            { "at": 0, "command": "start" },
            { "at": 2, "command": "answer", "question_id": "q1", "value": "B" },
            { "at": 4, "command": "signal", "signal": "visibility", "hidden": true },
            { "at": 6, "command": "answer", "question_id": "q2", "value": "false" },
            { "at": 8, "command": "submit" }
        ]));

        let bundle = replay(exam(), script, 30).unwrap();
        assert_eq!(bundle.attempt.score, Some(50));
        assert_eq!(bundle.attempt.tab_switch_count, 1);
        assert_eq!(
            bundle.attempt.start_time,
            OffsetDateTime::parse(
                "2025-03-01T09:00:00Z",
                &time::format_description::well_known::Rfc3339
            )
            .unwrap()
        );
        assert_eq!(bundle.submission_time, bundle.attempt.end_time.unwrap());
        assert_eq!((bundle.submission_time - bundle.attempt.start_time).whole_seconds(), 8);
    }

    #[test]
    fn identical_scripts_replay_byte_equal() {
        let events = json!([
            { "at": 0, "command": "start" },
            { "at": 3, "command": "answer", "question_id": "q1", "value": "B" },
            { "at": 5, "command": "submit" }
        ]);

        let first = replay(exam(), script(events.clone()), 30).unwrap();
        let second = replay(exam(), script(events), 30).unwrap();

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn script_without_submit_runs_to_auto_submit() {
        let script = script(json!([
            { "at": 0, "command": "start" },
            { "at": 2, "command": "answer", "question_id": "q1", "value": "B" }
        ]));

        let bundle = replay(exam(), script, 30).unwrap();
        assert_eq!(bundle.attempt.score, Some(50));
        // The one-minute clock ran out.
        assert_eq!(
            (bundle.submission_time - bundle.attempt.start_time).whole_seconds(),
            60
        );
    }

    #[test]
    fn late_start_script_still_runs_to_expiry() {
        let script = script(json!([
            { "at": 10, "command": "start" },
            { "at": 12, "command": "answer", "question_id": "q1", "value": "B" }
        ]));

        let bundle = replay(exam(), script, 30).unwrap();
        assert_eq!(bundle.attempt.score, Some(50));
        // Sixty seconds of exam time measured from the scripted start, not
        // from the virtual base instant.
        assert_eq!(
            (bundle.attempt.start_time - OffsetDateTime::parse(
                "2025-03-01T09:00:00Z",
                &time::format_description::well_known::Rfc3339
            )
            .unwrap())
            .whole_seconds(),
            10
        );
        assert_eq!(
            (bundle.submission_time - bundle.attempt.start_time).whole_seconds(),
            60
        );
    }

    #[test]
    fn abandoned_script_yields_no_bundle() {
        let script = script(json!([
            { "at": 0, "command": "start" },
            { "at": 2, "command": "abandon" }
        ]));

        assert!(replay(exam(), script, 30).is_err());
    }
}
