use std::sync::OnceLock;

use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::TelemetrySettings;

static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

/// Optional Prometheus recorder for engine counters. When disabled, the
/// `metrics` macros stay no-ops.
pub(crate) fn init(telemetry: &TelemetrySettings) -> anyhow::Result<()> {
    if !telemetry.prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = RECORDER.set(handle);

    describe_counter!("exam_sessions_total", "Exam sessions by outcome");
    describe_counter!("exam_violations_total", "Integrity violations recorded");
    describe_counter!("exam_auto_saves_total", "Auto-save ticks fired");

    Ok(())
}

/// Rendered exposition text, dumped at process end. None when the recorder
/// was never installed.
pub(crate) fn render() -> Option<String> {
    RECORDER.get().map(|handle| handle.render())
}
