//! PTY and clipboard errors with structured context.
//!
//! Each error names the failed operation and carries the underlying reason
//! so log lines stay machine-readable.

use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PtyError {
    #[error("Failed to open PTY: {0}")]
    Open(String),
    #[error("Failed to spawn shell: {0}")]
    Spawn(String),
    #[error("Failed to write to PTY: {0}")]
    Write(String),
    #[error("Failed to read from PTY: {0}")]
    Read(String),
    #[error("Failed to resize PTY: {0}")]
    Resize(String),
    #[error("Failed to reap shell process: {0}")]
    Wait(String),
}

impl PtyError {
    /// Returns structured context about the error for debugging.
    pub fn context(&self) -> Value {
        json!({
            "operation": self.operation(),
            "reason": self.reason()
        })
    }

    /// Returns a helpful suggestion for resolving the error.
    pub fn suggestion(&self) -> String {
        match self {
            PtyError::Open(_) => {
                "PTY allocation failed. Check system resource limits (ulimit -n).".to_string()
            }
            PtyError::Spawn(reason) => {
                if reason.contains("not found") || reason.contains("No such file") {
                    "Shell not found. Set ONETERM_SHELL or SHELL to an installed shell."
                        .to_string()
                } else if reason.contains("Permission denied") {
                    "Permission denied. Check the shell's file permissions.".to_string()
                } else {
                    "Shell spawn failed. Check ONETERM_SHELL.".to_string()
                }
            }
            PtyError::Write(_) | PtyError::Read(_) => {
                "The shell may have exited. Open a new tab.".to_string()
            }
            PtyError::Resize(_) => "Failed to resize terminal. Try resizing again.".to_string(),
            PtyError::Wait(_) => "The shell's exit status could not be read.".to_string(),
        }
    }

    /// Returns whether this error is potentially transient and may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PtyError::Read(_) | PtyError::Write(_))
    }

    /// Returns the operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            PtyError::Open(_) => "open",
            PtyError::Spawn(_) => "spawn",
            PtyError::Write(_) => "write",
            PtyError::Read(_) => "read",
            PtyError::Resize(_) => "resize",
            PtyError::Wait(_) => "wait",
        }
    }

    /// Returns the underlying reason/message for the error.
    pub fn reason(&self) -> &str {
        match self {
            PtyError::Open(r)
            | PtyError::Spawn(r)
            | PtyError::Write(r)
            | PtyError::Read(r)
            | PtyError::Resize(r)
            | PtyError::Wait(r) => r,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("Clipboard access failed: {0}")]
    Access(String),
}

impl ClipboardError {
    pub fn operation(&self) -> &'static str {
        match self {
            ClipboardError::Unavailable(_) => "open",
            ClipboardError::Access(_) => "access",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            ClipboardError::Unavailable(r) | ClipboardError::Access(r) => r,
        }
    }

    pub fn context(&self) -> Value {
        json!({
            "operation": self.operation(),
            "reason": self.reason()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pty_error_context() {
        let err = PtyError::Spawn("command not found".into());
        let ctx = err.context();
        assert_eq!(ctx["operation"], "spawn");
        assert_eq!(ctx["reason"], "command not found");
    }

    #[test]
    fn test_pty_error_suggestion_not_found() {
        let err = PtyError::Spawn("No such file or directory".into());
        assert!(err.suggestion().contains("ONETERM_SHELL"));
    }

    #[test]
    fn test_pty_error_is_retryable() {
        assert!(PtyError::Read("timeout".into()).is_retryable());
        assert!(PtyError::Write("broken pipe".into()).is_retryable());
        assert!(!PtyError::Open("failed".into()).is_retryable());
        assert!(!PtyError::Wait("ECHILD".into()).is_retryable());
    }

    #[test]
    fn test_pty_error_operation() {
        assert_eq!(PtyError::Open("x".into()).operation(), "open");
        assert_eq!(PtyError::Resize("x".into()).operation(), "resize");
        assert_eq!(PtyError::Wait("x".into()).operation(), "wait");
    }

    #[test]
    fn test_clipboard_error_context() {
        let err = ClipboardError::Unavailable("no display".into());
        assert_eq!(err.context()["operation"], "open");
        assert_eq!(err.reason(), "no display");
    }
}
