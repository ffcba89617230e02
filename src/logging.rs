//! Diagnostics logging using tracing
//!
//! Diagnostics go to stderr and never into the run log. Stdout belongs to
//! the mirrored run log, so the default level stays quiet.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used without `-v` and without an environment override
const DEFAULT_DIRECTIVE: &str = "warn";

/// Filter used with `-v`: debug for this crate, warnings for dependencies
const VERBOSE_DIRECTIVE: &str = "warn,scriptrun=debug";

/// Environment variables consulted for a filter, in order
const FILTER_ENV_VARS: [&str; 2] = ["SCRIPTRUN_LOG", "RUST_LOG"];

/// Pick the filter directive: `-v` wins, then the first non-empty env var
fn filter_directive(verbose: bool, lookup: impl Fn(&str) -> Option<String>) -> String {
    if verbose {
        return VERBOSE_DIRECTIVE.to_string();
    }
    FILTER_ENV_VARS
        .iter()
        .filter_map(|var| lookup(*var))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

/// Initialize the logging system
pub fn init(verbose: bool, json: bool) -> anyhow::Result<()> {
    let directive = filter_directive(verbose, |var| std::env::var(var).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid log filter '{}': {}", directive, e);
        EnvFilter::new(DEFAULT_DIRECTIVE)
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_verbose_wins() {
        let directive = filter_directive(true, env(&[("SCRIPTRUN_LOG", "error")]));
        assert_eq!(directive, VERBOSE_DIRECTIVE);
    }

    #[test]
    fn test_own_variable_before_rust_log() {
        let directive = filter_directive(
            false,
            env(&[("SCRIPTRUN_LOG", "info"), ("RUST_LOG", "trace")]),
        );
        assert_eq!(directive, "info");

        let directive = filter_directive(false, env(&[("SCRIPTRUN_LOG", " "), ("RUST_LOG", "trace")]));
        assert_eq!(directive, "trace");
    }

    #[test]
    fn test_default_is_quiet() {
        assert_eq!(filter_directive(false, env(&[])), DEFAULT_DIRECTIVE);
    }

    #[test]
    fn test_directives_parse() {
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVE).is_ok());
        assert!(EnvFilter::try_new(VERBOSE_DIRECTIVE).is_ok());
    }
}
