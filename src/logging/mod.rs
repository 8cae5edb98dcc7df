//! Logging system for Pomodesk
//!
//! Provides file-based logging with retention alongside console output.

mod file_writer;
mod retention;

pub use file_writer::{init_logging, LogFileInfo, LoggingGuard};
pub use retention::cleanup_old_logs_with_retention;
