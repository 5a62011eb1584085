use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration};

use crate::schemas::attempt::{StudentInfo, SubmissionBundle, ViolationKind};
use crate::schemas::exam::AnswerValue;
use crate::services::availability::AvailabilityStatus;
use crate::session::controller::{SessionController, SessionEvent, SessionPhase};
use crate::session::proctor::ProctorSignal;

/// One driver instruction, arriving as a JSON line in live mode or as a
/// scripted step in replay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub(crate) enum DriverCommand {
    Identity { student: StudentInfo },
    Start,
    Answer { question_id: String, value: AnswerValue },
    GoTo { index: usize },
    Signal(ProctorSignal),
    RequestFullscreen { granted: bool },
    Submit,
    Abandon,
}

/// Everything the engine reports back to its host, one JSON line each.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub(crate) enum RuntimeEvent {
    Ready { exam: String, questions: usize, remaining_seconds: u64 },
    IdentityAccepted,
    Started { attempt_id: String },
    Refused { action: String },
    AnswerRecorded { question_id: String },
    NavigationChanged { index: usize },
    Violation { kind: ViolationKind, message: String },
    Fullscreen { active: bool },
    AvailabilityChanged { status: AvailabilityStatus, message: String },
    TimeWarning { remaining_seconds: u64, display: String },
    AutoSave { answered_questions: usize },
    TimeExpired,
    Completed { score: u8, late: bool },
    Abandoned,
}

/// Drives one controller on a wall-clock second tick. Commands and events
/// flow over channels; a shutdown flip abandons an unfinished attempt. The
/// runtime owns the controller, so all mutation happens on this one task.
pub(crate) async fn run(
    mut controller: SessionController,
    mut commands: mpsc::Receiver<DriverCommand>,
    events: mpsc::Sender<RuntimeEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<Option<SubmissionBundle>> {
    let mut tick = interval(Duration::from_secs(1));
    // The first interval tick completes immediately; skip it so the session
    // clock starts counting from the first full second.
    tick.tick().await;

    events
        .send(RuntimeEvent::Ready {
            exam: controller.exam_title().to_string(),
            questions: controller.questions().len(),
            remaining_seconds: controller.remaining_seconds(),
        })
        .await
        .ok();

    let mut bundle = None;
    let mut commands_open = true;

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    if controller.abandon(OffsetDateTime::now_utc()) {
                        events.send(RuntimeEvent::Abandoned).await.ok();
                    }
                    break;
                }
            }
            command = commands.recv(), if commands_open => {
                match command {
                    Some(command) => {
                        let finished =
                            handle_command(&mut controller, command, &events, &mut bundle).await;
                        if finished {
                            break;
                        }
                    }
                    // Driver hung up; the session keeps ticking toward
                    // expiry or shutdown.
                    None => commands_open = false,
                }
            }
            _ = tick.tick() => {
                let session_events = controller.tick(OffsetDateTime::now_utc());
                let finished = forward_tick_events(session_events, &events, &mut bundle).await;
                if finished {
                    break;
                }
            }
        }
    }

    Ok(bundle)
}

async fn handle_command(
    controller: &mut SessionController,
    command: DriverCommand,
    events: &mpsc::Sender<RuntimeEvent>,
    bundle: &mut Option<SubmissionBundle>,
) -> bool {
    let now = OffsetDateTime::now_utc();

    match command {
        DriverCommand::Identity { student } => {
            let event = if controller.provide_identity(student) {
                RuntimeEvent::IdentityAccepted
            } else {
                RuntimeEvent::Refused { action: "identity".to_string() }
            };
            events.send(event).await.ok();
        }
        DriverCommand::Start => {
            let event = if controller.start(now) {
                let attempt_id = controller
                    .attempt()
                    .map(|attempt| attempt.id.clone())
                    .unwrap_or_default();
                RuntimeEvent::Started { attempt_id }
            } else {
                RuntimeEvent::Refused { action: "start".to_string() }
            };
            events.send(event).await.ok();
        }
        DriverCommand::Answer { question_id, value } => {
            let event = if controller.record_answer(&question_id, value) {
                RuntimeEvent::AnswerRecorded { question_id }
            } else {
                RuntimeEvent::Refused { action: format!("answer {question_id}") }
            };
            events.send(event).await.ok();
        }
        DriverCommand::GoTo { index } => {
            let event = if controller.go_to(index) {
                RuntimeEvent::NavigationChanged { index: controller.current_index() }
            } else {
                RuntimeEvent::Refused { action: format!("go-to {index}") }
            };
            events.send(event).await.ok();
        }
        DriverCommand::Signal(signal) => {
            if let Some(violation) = controller.observe_signal(&signal, now) {
                events
                    .send(RuntimeEvent::Violation {
                        kind: violation.kind,
                        message: violation.message,
                    })
                    .await
                    .ok();
            }
        }
        DriverCommand::RequestFullscreen { granted } => {
            let event = match controller.request_fullscreen(granted, now) {
                Some(violation) => RuntimeEvent::Violation {
                    kind: violation.kind,
                    message: violation.message,
                },
                None => RuntimeEvent::Fullscreen { active: controller.is_fullscreen() },
            };
            events.send(event).await.ok();
        }
        DriverCommand::Submit => match controller.submit(now) {
            Some(completed) => {
                send_completed(&completed, events).await;
                *bundle = Some(completed);
                return true;
            }
            None => {
                events.send(RuntimeEvent::Refused { action: "submit".to_string() }).await.ok();
            }
        },
        DriverCommand::Abandon => {
            if controller.abandon(now) {
                events.send(RuntimeEvent::Abandoned).await.ok();
            } else {
                events.send(RuntimeEvent::Refused { action: "abandon".to_string() }).await.ok();
            }
            return controller.phase() == SessionPhase::Abandoned;
        }
    }

    false
}

async fn forward_tick_events(
    session_events: Vec<SessionEvent>,
    events: &mpsc::Sender<RuntimeEvent>,
    bundle: &mut Option<SubmissionBundle>,
) -> bool {
    let mut finished = false;

    for event in session_events {
        match event {
            SessionEvent::AvailabilityChanged(availability) => {
                events
                    .send(RuntimeEvent::AvailabilityChanged {
                        status: availability.status,
                        message: availability.message,
                    })
                    .await
                    .ok();
            }
            SessionEvent::TimeWarning { remaining_seconds } => {
                events
                    .send(RuntimeEvent::TimeWarning {
                        remaining_seconds,
                        display: warning_display(remaining_seconds),
                    })
                    .await
                    .ok();
            }
            SessionEvent::AutoSaveDue { answered_questions } => {
                events.send(RuntimeEvent::AutoSave { answered_questions }).await.ok();
            }
            SessionEvent::TimeExpired => {
                events.send(RuntimeEvent::TimeExpired).await.ok();
            }
            SessionEvent::Completed(completed) => {
                send_completed(&completed, events).await;
                *bundle = Some(*completed);
                finished = true;
            }
        }
    }

    finished
}

async fn send_completed(bundle: &SubmissionBundle, events: &mpsc::Sender<RuntimeEvent>) {
    events
        .send(RuntimeEvent::Completed {
            score: bundle.attempt.score.unwrap_or_default(),
            late: bundle.attempt.is_late_submission,
        })
        .await
        .ok();
}

fn warning_display(remaining_seconds: u64) -> String {
    let minutes = remaining_seconds / 60;
    if minutes == 1 {
        "1 minute remaining!".to_string()
    } else {
        format!("{minutes} minutes remaining!")
    }
}
