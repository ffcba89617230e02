//! Log entry model - one timestamped line of the run log

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single immutable run-log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the entry was produced
    pub timestamp: DateTime<Utc>,

    /// Free-text message
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current time
    pub fn now(message: impl Into<String>) -> Self {
        Self::at(Utc::now(), message)
    }

    /// Create an entry with an explicit timestamp
    pub fn at(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }

    /// ISO-8601 timestamp with millisecond precision and a `Z` suffix
    pub fn iso_timestamp(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// The line as written to the log file, newline-terminated
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.iso_timestamp(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_line_format() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap();
        let entry = LogEntry::at(ts, "Executing extract");
        assert_eq!(entry.to_string(), "[2024-05-01T12:30:05.000Z] Executing extract");
        assert_eq!(entry.to_line(), "[2024-05-01T12:30:05.000Z] Executing extract\n");
    }

    #[test]
    fn test_millis_kept() {
        let ts = Utc.timestamp_millis_opt(1_714_566_605_123).unwrap();
        let entry = LogEntry::at(ts, "x");
        assert!(entry.iso_timestamp().ends_with(".123Z"));
    }

    #[test]
    fn test_message_verbatim() {
        let entry = LogEntry::now("Salida de extract: OK\n");
        assert!(entry.to_line().ends_with("Salida de extract: OK\n\n"));
    }
}
