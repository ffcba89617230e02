//! Command line interface

pub mod list;
pub mod run;

use crate::settings::Settings;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    /// A step failed and the sequence was aborted
    pub const STEP_FAILED: i32 = 1;
    /// Settings or the log file could not be loaded
    pub const SETUP_FAILED: i32 = 2;
    pub const UNEXPECTED_FAILURE: i32 = 3;
}

/// Run the data-processing scripts in order and log each step
#[derive(Debug, Parser)]
#[command(name = "scriptrun", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub global: GlobalArgs,

    /// Enable debug diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit diagnostics as JSON
    #[arg(long, global = true)]
    pub json_output: bool,
}

/// Options shared by every subcommand
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Directory the scripts run in; relative paths resolve against it
    #[arg(long, env = "SCRIPTRUN_BASE_DIR", default_value = ".", global = true)]
    pub base_dir: PathBuf,

    /// Settings file (defaults to scriptrun.toml in the base directory)
    #[arg(long, env = "SCRIPTRUN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Run log file, overriding the settings
    #[arg(long, env = "SCRIPTRUN_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Interpreter for every script, overriding the settings default
    #[arg(long, global = true)]
    pub interpreter: Option<String>,
}

impl GlobalArgs {
    /// Load settings and apply command line overrides
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load_from(&self.resolve(path)),
            None => Settings::load(&self.base_dir),
        }
        .context("Failed to load settings")?;

        if let Some(log_file) = &self.log_file {
            settings.log_file = log_file.clone();
        }
        if let Some(interpreter) = &self.interpreter {
            settings.interpreter = interpreter.clone();
        }
        Ok(settings)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute the script sequence (default)
    Run,
    /// Show the script sequence without running it
    List(list::ListArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["scriptrun"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.global.base_dir, PathBuf::from("."));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_list_with_global_flags() {
        let cli = Cli::try_parse_from([
            "scriptrun",
            "list",
            "--json",
            "--interpreter",
            "python3",
            "--base-dir",
            "/tmp/work",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::List(args)) => assert!(args.json),
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.global.interpreter.as_deref(), Some("python3"));
        assert_eq!(cli.global.base_dir, PathBuf::from("/tmp/work"));
    }

    #[test]
    fn test_overrides_applied_to_settings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("custom.toml"),
            "interpreter = \"python3\"\nmirror_console = false\n",
        )
        .unwrap();

        let args = GlobalArgs {
            base_dir: dir.path().to_path_buf(),
            config: Some(PathBuf::from("custom.toml")),
            log_file: Some(PathBuf::from("run.log")),
            interpreter: None,
        };
        let settings = args.settings().unwrap();
        assert_eq!(settings.interpreter, "python3");
        assert!(!settings.mirror_console);
        assert_eq!(settings.log_path(dir.path()), dir.path().join("run.log"));

        let args = GlobalArgs {
            interpreter: Some("pypy".to_string()),
            ..args
        };
        assert_eq!(args.settings().unwrap().interpreter, "pypy");
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = GlobalArgs {
            base_dir: dir.path().to_path_buf(),
            config: Some(PathBuf::from("missing.toml")),
            log_file: None,
            interpreter: None,
        };
        let err = args.settings().unwrap_err();
        assert!(format!("{:#}", err).contains("missing.toml"));

        let args = GlobalArgs { config: None, ..args };
        assert_eq!(args.settings().unwrap().interpreter, "python");
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
