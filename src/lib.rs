pub(crate) mod cli;
pub(crate) mod core;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod session;

use crate::core::{config::Settings, telemetry};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(settings.telemetry())?;
    core::metrics::init(settings.telemetry())?;
    tracing::debug!(environment = settings.runtime().environment.as_str(), "Settings loaded");

    let command = cli::Command::parse(std::env::args().skip(1))?;
    cli::execute(command, &settings).await
}
