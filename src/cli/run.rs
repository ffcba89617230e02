//! `run` command - execute the script sequence

use super::{exit_codes, GlobalArgs};
use crate::core::LogSink;
use crate::host::CommandRunner;
use crate::runner::Runner;
use anyhow::Context;

/// Execute the sequence; returns the process exit code
pub async fn run(global: &GlobalArgs) -> anyhow::Result<i32> {
    let settings = global.settings()?;
    let log_path = settings.log_path(&global.base_dir);

    let sink = LogSink::open(&log_path)
        .context("Failed to open run log")?
        .with_console(settings.mirror_console);
    tracing::debug!(path = ?sink.path(), "Run log ready");

    let command_runner = settings.env.iter().fold(
        CommandRunner::new().with_working_directory(&global.base_dir),
        |runner, (key, value)| runner.with_env(key, value),
    );
    let runner = Runner::with_command_runner(settings.command_spec(), sink, command_runner);
    let report = runner.run().await;

    if let Some(e) = &report.close_error {
        tracing::warn!(path = %log_path.display(), "{}", e);
    }
    tracing::debug!(
        executed = report.executed,
        outcome = ?report.outcome(),
        "Run finished"
    );

    Ok(if report.succeeded() {
        exit_codes::SUCCESS
    } else {
        exit_codes::STEP_FAILED
    })
}
