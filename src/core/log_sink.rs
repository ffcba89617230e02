//! Append-only run log
//!
//! Every entry goes to the console first, then to the backing file.
//! The console copy is best effort: a failed console write never blocks the
//! file write. The sink is closed by consuming it, so it can be released only
//! once.

use super::LogEntry;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while opening or writing the run log
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to open log file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write log entry: {0}")]
    Write(#[source] io::Error),

    #[error("Failed to flush log file: {0}")]
    Flush(#[source] io::Error),
}

type BoxedWriter = Box<dyn Write + Send>;

/// Persistent, append-only destination for log entries
pub struct LogSink {
    path: Option<PathBuf>,
    writer: Option<BoxedWriter>,
    console: Option<BoxedWriter>,
    entries_written: usize,
}

impl LogSink {
    /// Open (or create) the log file in append mode, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| SinkError::Open {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(open_err)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_err)?;

        tracing::debug!(path = %path.display(), "Opened log sink");

        Ok(Self {
            path: Some(path),
            writer: Some(Box::new(file)),
            console: Some(Box::new(io::stdout())),
            entries_written: 0,
        })
    }

    /// Wrap an arbitrary writer (no backing path, no console)
    #[cfg(test)]
    pub(crate) fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            path: None,
            writer: Some(Box::new(writer)),
            console: None,
            entries_written: 0,
        }
    }

    /// Enable or disable mirroring entries to stdout
    pub fn with_console(mut self, mirror: bool) -> Self {
        self.console = if mirror {
            Some(Box::new(io::stdout()))
        } else {
            None
        };
        self
    }

    /// Mirror entries to `console` instead of stdout
    #[cfg(test)]
    pub(crate) fn with_console_writer(mut self, console: impl Write + Send + 'static) -> Self {
        self.console = Some(Box::new(console));
        self
    }

    /// Path of the backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Stamp `message` with the current time and append it
    pub fn write(&mut self, message: impl Into<String>) -> Result<LogEntry, SinkError> {
        let entry = LogEntry::now(message);
        self.append(&entry)?;
        Ok(entry)
    }

    /// Append an already-built entry
    pub fn append(&mut self, entry: &LogEntry) -> Result<(), SinkError> {
        self.mirror(entry);

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| SinkError::Write(io::Error::other("log sink already closed")))?;
        writer
            .write_all(entry.to_line().as_bytes())
            .map_err(SinkError::Write)?;

        self.entries_written += 1;
        Ok(())
    }

    /// Copy an entry to the console; a failing console is dropped for the rest of the run
    fn mirror(&mut self, entry: &LogEntry) {
        let Some(console) = self.console.as_mut() else {
            return;
        };
        let result = writeln!(console, "{}", entry.to_string().trim_end())
            .and_then(|()| console.flush());
        if let Err(e) = result {
            tracing::warn!("Console mirroring disabled: {}", e);
            self.console = None;
        }
    }

    /// Flush and release the underlying writer
    pub fn close(mut self) -> Result<(), SinkError> {
        let result = self.release();
        tracing::debug!(entries = self.entries_written, "Closed log sink");
        result
    }

    fn release(&mut self) -> Result<(), SinkError> {
        match self.writer.take() {
            Some(mut writer) => writer.flush().map_err(SinkError::Flush),
            None => Ok(()),
        }
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        if self.writer.is_some() {
            if let Err(e) = self.release() {
                tracing::warn!("Log sink dropped without close, flush failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink")
            .field("path", &self.path)
            .field("open", &self.writer.is_some())
            .field("console", &self.console.is_some())
            .field("entries_written", &self.entries_written)
            .finish()
    }
}

/// In-memory writer shared between a sink and a test, counting flushes
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer {
    data: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
    flushes: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    dropped: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.data.lock().unwrap()).into_owned()
    }

    /// Messages of every entry, split on the `[<timestamp>] ` line prefix
    pub(crate) fn messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = Vec::new();
        for line in self.contents().split_inclusive('\n') {
            match entry_message(line) {
                Some(message) => messages.push(message.to_string()),
                None => {
                    if let Some(last) = messages.last_mut() {
                        last.push_str(line);
                    }
                }
            }
        }
        messages
            .into_iter()
            .map(|m| m.trim_end_matches('\n').to_string())
            .collect()
    }

    pub(crate) fn flushes(&self) -> usize {
        self.flushes.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// How many writer handles have been released
    pub(crate) fn releases(&self) -> usize {
        self.dropped.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub(crate) fn handle(&self) -> SharedBufferHandle {
        SharedBufferHandle(self.clone())
    }
}

/// Message part of a line starting with `[<ISO-8601 timestamp>] `
#[cfg(test)]
fn entry_message(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('[')?;
    let (timestamp, message) = rest.split_once("] ")?;
    chrono::DateTime::parse_from_rfc3339(timestamp).ok()?;
    Some(message)
}

/// Writer half of [`SharedBuffer`]; dropping it counts as a release
#[cfg(test)]
pub(crate) struct SharedBufferHandle(SharedBuffer);

#[cfg(test)]
impl Write for SharedBufferHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.data.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .flushes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
impl Drop for SharedBufferHandle {
    fn drop(&mut self) {
        self.0
            .dropped
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}
