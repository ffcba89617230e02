//! Sequential step runner
//!
//! Executes a [`CommandSpec`] front to back, writing one log entry before
//! each launch and one after it. The first failing step aborts the rest of
//! the sequence. The log sink is closed once after the loop on both outcomes;
//! if the loop unwinds instead, dropping the sink flushes it.

use crate::core::{CommandSpec, LogSink, SinkError, Step};
use crate::host::{CommandError, CommandRunner};
use serde::Serialize;
use std::fmt;

/// Final message of a run where every step succeeded
pub const SUCCESS_MESSAGE: &str = "All scripts executed successfully.";

/// Position of a run in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    /// Step `i` is executing
    Running(usize),
    Completed,
    /// Step `i` failed
    Aborted(usize),
    /// Log sink released
    Closed,
}

/// Why a run stopped early
#[derive(Debug)]
pub enum RunFailure {
    /// A step could not be spawned or exited non-zero
    Step {
        index: usize,
        name: String,
        error: CommandError,
    },
    /// The log sink rejected a write
    Sink(SinkError),
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunFailure::Step { error, .. } => write!(f, "{}", error),
            RunFailure::Sink(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RunFailure {}

impl From<SinkError> for RunFailure {
    fn from(e: SinkError) -> Self {
        RunFailure::Sink(e)
    }
}

/// Summary of a finished run
#[derive(Debug)]
pub struct RunReport {
    /// Every state the run passed through, ending in `Closed`
    pub transitions: Vec<RunState>,
    /// Steps that were launched (including a failed one)
    pub executed: usize,
    /// Cause of the abort, if any
    pub failure: Option<RunFailure>,
    /// Error raised while closing the sink
    pub close_error: Option<SinkError>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Terminal state of the step loop (`Completed` or `Aborted`)
    pub fn outcome(&self) -> RunState {
        self.transitions
            .iter()
            .rev()
            .find(|s| matches!(s, RunState::Completed | RunState::Aborted(_)))
            .copied()
            .unwrap_or(RunState::Idle)
    }
}

/// Owns the log sink and the command sequence for one run
pub struct Runner {
    spec: CommandSpec,
    sink: Option<LogSink>,
    command_runner: CommandRunner,
    transitions: Vec<RunState>,
    executed: usize,
}

impl Runner {
    pub fn with_command_runner(
        spec: CommandSpec,
        sink: LogSink,
        command_runner: CommandRunner,
    ) -> Self {
        Self {
            spec,
            sink: Some(sink),
            command_runner,
            transitions: vec![RunState::Idle],
            executed: 0,
        }
    }

    pub fn state(&self) -> RunState {
        self.transitions.last().copied().unwrap_or(RunState::Idle)
    }

    /// Execute every step in order, stopping at the first failure
    pub async fn run(mut self) -> RunReport {
        let result = self.run_steps().await;

        let failure = match result {
            Ok(()) => {
                self.transition(RunState::Completed);
                if let Err(e) = self.log(SUCCESS_MESSAGE) {
                    tracing::warn!("Failed to record run completion: {}", e);
                }
                None
            }
            Err(failure) => {
                let index = match &failure {
                    RunFailure::Step { index, name, .. } => {
                        tracing::warn!(step = index, name = %name, "Run aborted: {}", failure);
                        *index
                    }
                    RunFailure::Sink(_) => {
                        tracing::warn!("Run aborted: {}", failure);
                        match self.state() {
                            RunState::Running(i) => i,
                            _ => 0,
                        }
                    }
                };
                self.transition(RunState::Aborted(index));
                if let Err(e) = self.log(format!("The process failed: {}", failure)) {
                    tracing::warn!("Failed to record run failure: {}", e);
                }
                Some(failure)
            }
        };

        let close_error = self.close_sink().err();
        self.transition(RunState::Closed);

        RunReport {
            transitions: std::mem::take(&mut self.transitions),
            executed: self.executed,
            failure,
            close_error,
        }
    }

    async fn run_steps(&mut self) -> Result<(), RunFailure> {
        let spec = self.spec.clone();
        if spec.is_empty() {
            tracing::debug!("Empty command sequence");
        } else {
            tracing::debug!(steps = spec.len(), "Starting command sequence");
        }
        for (index, step) in spec.iter().enumerate() {
            self.transition(RunState::Running(index));
            self.run_step(index, step).await?;
        }
        Ok(())
    }

    async fn run_step(&mut self, index: usize, step: &Step) -> Result<(), RunFailure> {
        self.log(format!("Executing {}", step.name))?;
        self.executed += 1;

        match self.command_runner.run_async(step).await {
            Ok(output) => {
                tracing::debug!(
                    step = %step.name,
                    exit_code = ?output.exit_code,
                    stderr_bytes = output.stderr.len(),
                    "Step succeeded"
                );
                self.log(format!("{} executed successfully", step.name))?;
                if !output.stdout.is_empty() {
                    self.log(format!("Salida de {}: {}", step.name, output.stdout))?;
                }
                Ok(())
            }
            Err(error) => {
                tracing::debug!(
                    step = %step.name,
                    spawn = error.is_spawn_error(),
                    exit_code = ?error.exit_code(),
                    "Step failed"
                );
                self.log(format!("Error executing {}: {}", step.name, error.diagnostic()))?;
                Err(RunFailure::Step {
                    index,
                    name: step.name.clone(),
                    error,
                })
            }
        }
    }

    fn log(&mut self, message: impl Into<String>) -> Result<(), SinkError> {
        match self.sink.as_mut() {
            Some(sink) => sink.write(message).map(|_| ()),
            None => Err(SinkError::Write(std::io::Error::other(
                "log sink already closed",
            ))),
        }
    }

    fn close_sink(&mut self) -> Result<(), SinkError> {
        match self.sink.take() {
            Some(sink) => sink.close(),
            None => Ok(()),
        }
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = ?self.state(), to = ?next, "Run state transition");
        self.transitions.push(next);
    }
}
