use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use time::OffsetDateTime;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use crate::core::config::Settings;
use crate::core::{metrics, shutdown};
use crate::services::exam_loader;
use crate::session::controller::SessionController;
use crate::session::runtime::{self, DriverCommand, RuntimeEvent};

/// Live embedding surface: driver commands as JSON lines on stdin, session
/// events as JSON lines on stdout. Ctrl-C abandons an unfinished attempt.
pub(crate) async fn run(
    exam_path: &Path,
    out: Option<&Path>,
    seed: Option<u64>,
    settings: &Settings,
) -> Result<()> {
    let exam = exam_loader::load_exam(exam_path)
        .with_context(|| format!("Exam definition rejected: {}", exam_path.display()))?;

    let controller = SessionController::new(
        exam,
        seed,
        settings.session().availability_poll_seconds,
        OffsetDateTime::now_utc(),
    );
    tracing::info!(
        exam = controller.exam_title(),
        time_limit = %controller.format_remaining(),
        seed = controller.shuffle_seed(),
        "Session loaded"
    );

    let (command_tx, command_rx) = mpsc::channel::<DriverCommand>(32);
    let (event_tx, mut event_rx) = mpsc::channel::<RuntimeEvent>(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<DriverCommand>(&line) {
                Ok(command) => {
                    if command_tx.send(command).await.is_err() {
                        break;
                    }
                }
                Err(err) => tracing::warn!(error = %err, "Ignoring malformed driver command"),
            }
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(err) => tracing::error!(error = %err, "Failed to serialize session event"),
            }
        }
    });

    let engine = tokio::spawn(runtime::run(controller, command_rx, event_tx, shutdown_rx));

    tokio::select! {
        _ = shutdown::shutdown_signal() => {
            if shutdown_tx.send(true).is_err() {
                tracing::warn!("Failed to signal session shutdown");
            }
        }
        _ = shutdown_tx.closed() => {}
    }

    let bundle = engine.await.context("Session runtime task failed")??;

    reader.abort();
    if let Err(err) = printer.await {
        if !err.is_cancelled() {
            tracing::error!(error = %err, "Event printer task failed");
        }
    }

    if let Some(bundle) = &bundle {
        if let Some(path) = out {
            let payload = serde_json::to_string_pretty(bundle)?;
            fs::write(path, payload)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(out = %path.display(), "Submission bundle exported");
        }
    }

    if let Some(rendered) = metrics::render() {
        tracing::info!(metrics = %rendered, "Session metrics");
    }

    Ok(())
}
