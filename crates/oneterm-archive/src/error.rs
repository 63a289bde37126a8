//! Archival errors with structured context.
//!
//! None of these ever reach the interactive session: workers log them and
//! drop the job. The helpers exist so the log line carries the failing
//! step and the underlying reason as separate fields.

use std::path::PathBuf;

use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Invalid compression level {level} (supported: {min}..={max})")]
    InvalidLevel { level: i32, min: i32, max: i32 },
    #[error("Failed to initialise compressor at level {level}: {reason}")]
    CompressorInit { level: i32, reason: String },
    #[error("Failed to create directory '{}': {reason}", path.display())]
    CreateDir { path: PathBuf, reason: String },
    #[error("Failed to create temp file for '{}': {reason}", path.display())]
    CreateTemp { path: PathBuf, reason: String },
    #[error("Compression stream failed: {0}")]
    Compress(String),
    #[error("Failed to write '{}': {reason}", path.display())]
    Write { path: PathBuf, reason: String },
    #[error("Failed to sync '{}': {reason}", path.display())]
    Sync { path: PathBuf, reason: String },
    #[error("Failed to rename '{}' to '{}': {reason}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },
    #[error("Failed to start archive worker pool: {0}")]
    PoolStart(String),
    #[error("Archival subsystem has been shut down")]
    ShutDown,
}

impl ArchiveError {
    /// Returns the pipeline step that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            ArchiveError::InvalidLevel { .. } => "level",
            ArchiveError::CompressorInit { .. } => "compressor_init",
            ArchiveError::CreateDir { .. } => "create_dir",
            ArchiveError::CreateTemp { .. } => "create_temp",
            ArchiveError::Compress(_) => "compress",
            ArchiveError::Write { .. } => "write",
            ArchiveError::Sync { .. } => "sync",
            ArchiveError::Rename { .. } => "rename",
            ArchiveError::PoolStart(_) => "pool_start",
            ArchiveError::ShutDown => "submit",
        }
    }

    /// Returns the underlying reason for the failure.
    pub fn reason(&self) -> String {
        match self {
            ArchiveError::InvalidLevel { level, .. } => format!("level {} out of range", level),
            ArchiveError::CompressorInit { reason, .. }
            | ArchiveError::CreateDir { reason, .. }
            | ArchiveError::CreateTemp { reason, .. }
            | ArchiveError::Write { reason, .. }
            | ArchiveError::Sync { reason, .. }
            | ArchiveError::Rename { reason, .. } => reason.clone(),
            ArchiveError::Compress(reason) | ArchiveError::PoolStart(reason) => reason.clone(),
            ArchiveError::ShutDown => "archiver already shut down".to_string(),
        }
    }

    /// Returns structured context about the error for the diagnostic log.
    pub fn context(&self) -> Value {
        match self {
            ArchiveError::InvalidLevel { level, min, max } => json!({
                "operation": self.operation(),
                "level": level,
                "min": min,
                "max": max
            }),
            ArchiveError::CompressorInit { level, reason } => json!({
                "operation": self.operation(),
                "level": level,
                "reason": reason
            }),
            ArchiveError::CreateDir { path, reason }
            | ArchiveError::CreateTemp { path, reason }
            | ArchiveError::Write { path, reason }
            | ArchiveError::Sync { path, reason } => json!({
                "operation": self.operation(),
                "path": path.display().to_string(),
                "reason": reason
            }),
            ArchiveError::Rename { from, to, reason } => json!({
                "operation": self.operation(),
                "from": from.display().to_string(),
                "to": to.display().to_string(),
                "reason": reason
            }),
            ArchiveError::Compress(_) | ArchiveError::PoolStart(_) | ArchiveError::ShutDown => {
                json!({
                    "operation": self.operation(),
                    "reason": self.reason()
                })
            }
        }
    }

    /// Whether the same job could succeed on a later attempt.
    ///
    /// Jobs are never retried automatically; this only tags the log line.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ArchiveError::CreateTemp { .. }
                | ArchiveError::Write { .. }
                | ArchiveError::Sync { .. }
                | ArchiveError::Rename { .. }
        )
    }

    /// Returns a hint for the operator reading the log.
    pub fn suggestion(&self) -> &'static str {
        match self {
            ArchiveError::InvalidLevel { .. } => "Use a zstd level between 1 and 22.",
            ArchiveError::CompressorInit { .. } | ArchiveError::Compress(_) => {
                "The compressor could not run. Check available memory."
            }
            ArchiveError::CreateDir { .. } | ArchiveError::CreateTemp { .. } => {
                "Check that the log directory is writable (ONETERM_LOG_DIR overrides it)."
            }
            ArchiveError::Write { .. } | ArchiveError::Sync { .. } => {
                "Writing the archive failed. The disk may be full."
            }
            ArchiveError::Rename { .. } => {
                "The archive could not be moved into place. Check the log directory permissions."
            }
            ArchiveError::PoolStart(_) => "Check system thread limits (ulimit -u).",
            ArchiveError::ShutDown => "Archives cannot be submitted once shutdown has started.",
        }
    }
}
