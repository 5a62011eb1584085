use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::TelemetrySettings;

/// Install the global subscriber. `RUST_LOG` wins over the configured level
/// so a session can be debugged without touching settings.
pub(crate) fn init_tracing(telemetry: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(telemetry.log_level.clone()));

    // Session events leave on stdout as JSON lines; logs stay on stderr.
    let builder = fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr);

    if telemetry.json {
        builder.json().try_init().map_err(|err| anyhow::anyhow!(err.to_string()))?;
    } else {
        builder.try_init().map_err(|err| anyhow::anyhow!(err.to_string()))?;
    }

    Ok(())
}
