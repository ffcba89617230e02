//! Command sequence model - the fixed, ordered list of external steps

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Scripts executed by a default run, in order
pub const DEFAULT_SCRIPTS: [&str; 3] = [
    "scripts/extract.py",
    "scripts/merge_data.py",
    "scripts/merge_csv_data.py",
];

/// Interpreter used when nothing else is configured
pub const DEFAULT_INTERPRETER: &str = "python";

/// One external command: `<interpreter> <script>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Name used in log messages
    pub name: String,
    /// Program that launches the script
    pub interpreter: String,
    /// Script passed as the sole argument
    pub script: PathBuf,
}

impl Step {
    /// Create a step named after its script path
    pub fn new(interpreter: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        let script = script.into();
        Self {
            name: script.display().to_string(),
            interpreter: interpreter.into(),
            script,
        }
    }

    /// Override the display name
    #[cfg(test)]
    pub(crate) fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Command line as it would be typed in a shell
    pub fn command_line(&self) -> String {
        format!("{} {}", self.interpreter, self.script.display())
    }
}

/// Ordered sequence of steps, fixed for the lifetime of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    steps: Vec<Step>,
}

impl CommandSpec {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// The built-in sequence, each script launched by `interpreter_for(script)`
    pub fn builtin<F>(interpreter_for: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        Self::new(
            DEFAULT_SCRIPTS
                .iter()
                .map(|script| Step::new(interpreter_for(*script), *script))
                .collect(),
        )
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }
}

impl<'a> IntoIterator for &'a CommandSpec {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
