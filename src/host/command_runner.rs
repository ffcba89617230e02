//! Command Runner
//!
//! Launches one external step as `<interpreter> <script>`, waits for it to
//! exit and captures both output streams. The interpreter may carry its own
//! arguments (`python -u`, `uv run python`), split with shell quoting rules.

use crate::core::Step;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

/// Captured result of a step that exited successfully
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Exit code if available
    pub exit_code: Option<i32>,
}

/// Command runner errors
#[derive(Debug, Error)]
pub enum CommandError {
    /// Interpreter not found on disk or in PATH
    #[error("Command failed: {command}: '{program}' not found. Install it or add to PATH.")]
    NotFound { command: String, program: String },

    /// Process could not be started
    #[error("Command failed: {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Interpreter setting could not be split into words
    #[error("Command failed: {command}: invalid interpreter: {reason}")]
    InvalidInterpreter { command: String, reason: String },

    /// Process ran and reported failure
    #[error("Command failed: {command}{}", stderr_suffix(.stderr))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\n{}", stderr)
    }
}

impl CommandError {
    /// Exit code of a process that ran and failed
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::NonZeroExit { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether the process never started
    pub fn is_spawn_error(&self) -> bool {
        !matches!(self, CommandError::NonZeroExit { .. })
    }

    /// Text to report for this failure: captured stderr, else the error itself
    pub fn diagnostic(&self) -> String {
        match self {
            CommandError::NonZeroExit { stderr, .. } if !stderr.is_empty() => stderr.clone(),
            _ => self.to_string(),
        }
    }
}

/// Command runner for executing external steps
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    /// Environment variables to add
    env_additions: HashMap<String, String>,
    /// Directory the steps run in
    working_directory: Option<PathBuf>,
}

impl CommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_additions.insert(key.into(), value.into());
        self
    }

    /// Run steps from `dir` instead of the current directory
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Find a binary in PATH
    pub fn which(binary: &str) -> Option<PathBuf> {
        which::which(binary).ok()
    }

    fn resolve(&self, program: &str, command: &str) -> Result<PathBuf, CommandError> {
        let direct = Path::new(program);
        let candidate = match (&self.working_directory, direct.is_relative()) {
            (Some(dir), true) if direct.components().count() > 1 => dir.join(direct),
            _ => direct.to_path_buf(),
        };
        if candidate.components().count() > 1 || candidate.is_absolute() {
            return if candidate.exists() {
                Ok(candidate)
            } else {
                Err(CommandError::NotFound {
                    command: command.to_string(),
                    program: program.to_string(),
                })
            };
        }

        Self::which(program).ok_or_else(|| CommandError::NotFound {
            command: command.to_string(),
            program: program.to_string(),
        })
    }

    /// Split the interpreter setting into program and leading arguments
    fn interpreter_words(interpreter: &str, command: &str) -> Result<Vec<String>, CommandError> {
        let words = shell_words::split(interpreter).map_err(|e| {
            CommandError::InvalidInterpreter {
                command: command.to_string(),
                reason: e.to_string(),
            }
        })?;
        if words.is_empty() {
            return Err(CommandError::InvalidInterpreter {
                command: command.to_string(),
                reason: "empty".to_string(),
            });
        }
        Ok(words)
    }

    /// Run a step to completion and capture its output
    pub fn run(&self, step: &Step) -> Result<CommandOutput, CommandError> {
        let command_line = step.command_line();
        let words = Self::interpreter_words(&step.interpreter, &command_line)?;
        let program = self.resolve(&words[0], &command_line)?;

        let mut cmd = Command::new(&program);
        cmd.args(&words[1..]);
        cmd.arg(&step.script);

        if let Some(dir) = &self.working_directory {
            cmd.current_dir(dir);
        }
        for (k, v) in &self.env_additions {
            cmd.env(k, v);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(command = %command_line, program = %program.display(), "Spawning step");

        let output = cmd.output().map_err(|source| CommandError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let exit_code = output.status.code();

        tracing::debug!(command = %command_line, ?exit_code, "Step exited");

        if output.status.success() {
            Ok(CommandOutput {
                stdout,
                stderr,
                exit_code,
            })
        } else {
            Err(CommandError::NonZeroExit {
                command: command_line,
                code: exit_code,
                stderr,
            })
        }
    }

    /// Run a step on the blocking pool
    pub async fn run_async(&self, step: &Step) -> Result<CommandOutput, CommandError> {
        let runner = self.clone();
        let step = step.clone();
        let command = step.command_line();

        tokio::task::spawn_blocking(move || runner.run(&step))
            .await
            .map_err(|e| CommandError::Spawn {
                command,
                source: io::Error::other(e.to_string()),
            })?
    }
}
