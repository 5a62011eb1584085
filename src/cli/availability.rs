use std::path::Path;

use anyhow::{Context, Result};
use time::OffsetDateTime;

use crate::services::availability::{self, Availability};
use crate::services::exam_loader;

/// One-shot availability check: evaluate the definition's schedule at the
/// current instant and print the result as JSON. A polling consumer simply
/// invokes this on its own cadence.
pub(crate) fn run(exam_path: &Path) -> Result<()> {
    let exam = exam_loader::load_exam(exam_path)
        .with_context(|| format!("Exam definition rejected: {}", exam_path.display()))?;

    let evaluated =
        availability::evaluate(OffsetDateTime::now_utc(), exam.config.schedule.as_ref());

    println!("{}", serde_json::to_string_pretty(&render(&evaluated)?)?);
    Ok(())
}

/// The service payload plus a preformatted countdown toward whichever window
/// boundary comes next.
fn render(evaluated: &Availability) -> Result<serde_json::Value> {
    let mut payload = serde_json::to_value(evaluated)?;

    let seconds = evaluated
        .time_until_start
        .or(evaluated.time_until_end)
        .or(evaluated.time_until_closure);
    if let Some(seconds) = seconds {
        payload["countdown"] =
            serde_json::Value::String(availability::format_countdown(seconds));
    }

    Ok(payload)
}
