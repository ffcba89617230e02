//! Core data models: log entries, the log sink and the command sequence

mod command_spec;
mod log_entry;
mod log_sink;

pub use command_spec::*;
pub use log_entry::*;
pub use log_sink::*;
