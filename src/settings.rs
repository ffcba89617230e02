//! Settings for scriptrun
//!
//! Loaded from an optional `scriptrun.toml` in the base directory, where a
//! missing file yields the defaults, or from an explicitly named file, which
//! must exist.

use crate::core::{CommandSpec, DEFAULT_INTERPRETER};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings file looked up in the base directory
pub const SETTINGS_FILE_NAME: &str = "scriptrun.toml";

/// Default run log location, relative to the base directory
pub const DEFAULT_LOG_FILE: &str = "logs/universal_script.log";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// User-tunable settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Interpreter used to launch every script
    pub interpreter: String,

    /// Per-script interpreter overrides, keyed by script path
    pub interpreters: HashMap<String, String>,

    /// Run log path, relative to the base directory unless absolute
    pub log_file: PathBuf,

    /// Mirror log entries to stdout
    pub mirror_console: bool,

    /// Extra environment variables for every step
    pub env: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            interpreters: HashMap::new(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            mirror_console: true,
            env: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load from an explicitly named file, which must exist
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `scriptrun.toml` from the base directory; a missing file gives defaults
    pub fn load(base_dir: &Path) -> Result<Self, SettingsError> {
        let path = base_dir.join(SETTINGS_FILE_NAME);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Interpreter for a given script
    pub fn interpreter_for(&self, script: &str) -> String {
        self.interpreters
            .get(script)
            .cloned()
            .unwrap_or_else(|| self.interpreter.clone())
    }

    /// The built-in command sequence with these interpreters applied
    pub fn command_spec(&self) -> CommandSpec {
        CommandSpec::builtin(|script| self.interpreter_for(script))
    }

    /// Absolute-or-base-relative log file location
    pub fn log_path(&self, base_dir: &Path) -> PathBuf {
        if self.log_file.is_absolute() {
            self.log_file.clone()
        } else {
            base_dir.join(&self.log_file)
        }
    }
}
