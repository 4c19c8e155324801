//! cPanel Backup Library
//!
//! Unattended full-account backups: ask cPanel to build the archive, wait
//! for it to appear and finish writing, push it offsite, clean up and
//! report the outcome by mail.

pub mod api;
pub mod config;
pub mod executor;
pub mod fs;
pub mod notify;
pub mod transfer;
pub mod utils;
pub mod watcher;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::Config;
pub use executor::{BackupOrchestrator, RunReport, RunResult};
pub use utils::errors::{BackupError, Result};
