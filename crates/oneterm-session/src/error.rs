//! Session-level errors with structured context.

use oneterm_archive::ArchiveError;
use oneterm_terminal::PtyError;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Window not found: {0}")]
    WindowNotFound(String),
    #[error("PTY error: {0}")]
    Pty(#[from] PtyError),
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("Failed to start background runtime: {0}")]
    Runtime(String),
}

impl SessionError {
    /// Returns structured context about the error for debugging.
    pub fn context(&self) -> Value {
        match self {
            SessionError::NotFound(id) => json!({ "session_id": id }),
            SessionError::WindowNotFound(id) => json!({ "window_id": id }),
            SessionError::Pty(pty_err) => pty_err.context(),
            SessionError::Archive(archive_err) => archive_err.context(),
            SessionError::Runtime(reason) => json!({ "operation": "runtime", "reason": reason }),
        }
    }

    /// Returns a helpful suggestion for resolving the error.
    pub fn suggestion(&self) -> String {
        match self {
            SessionError::NotFound(_) | SessionError::WindowNotFound(_) => {
                "The tab or window was already closed.".to_string()
            }
            SessionError::Pty(pty_err) => pty_err.suggestion(),
            SessionError::Archive(archive_err) => archive_err.suggestion().to_string(),
            SessionError::Runtime(_) => "Check system thread limits (ulimit -u).".to_string(),
        }
    }

    /// Returns whether this error is potentially transient and may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Pty(pty_err) => pty_err.is_retryable(),
            SessionError::Archive(archive_err) => archive_err.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_delegates_to_pty_error() {
        let err = SessionError::from(PtyError::Write("broken pipe".into()));
        assert_eq!(err.context()["operation"], "write");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_archive_shutdown_not_retryable() {
        let err = SessionError::from(ArchiveError::ShutDown);
        assert!(!err.is_retryable());
        assert_eq!(err.context()["operation"], "submit");
    }

    #[test]
    fn test_not_found_context() {
        let err = SessionError::NotFound("a1b2c3d4".into());
        assert_eq!(err.context()["session_id"], "a1b2c3d4");
    }
}
