//! Application errors with structured context and sysexits-style exit codes.

use std::io;

use serde_json::{json, Value};
use thiserror::Error;

use oneterm_session::SessionError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Terminal error: {0}")]
    Terminal(#[from] io::Error),

    #[error("Event read failed: {0}")]
    EventRead(String),

    #[error("Failed to spawn {name} thread: {reason}")]
    ThreadSpawn { name: String, reason: String },

    #[error("Failed to set up signal handler: {0}")]
    SignalSetup(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AppError {
    /// Returns structured context about the error for debugging.
    pub fn context(&self) -> Value {
        match self {
            AppError::Terminal(e) => json!({
                "operation": "terminal",
                "reason": e.to_string()
            }),
            AppError::EventRead(reason) => json!({
                "operation": "event_read",
                "reason": reason
            }),
            AppError::ThreadSpawn { name, reason } => json!({
                "operation": "thread_spawn",
                "thread": name,
                "reason": reason
            }),
            AppError::SignalSetup(reason) => json!({
                "operation": "signal_setup",
                "reason": reason
            }),
            AppError::Session(e) => e.context(),
        }
    }

    /// Returns a helpful suggestion for resolving the error.
    pub fn suggestion(&self) -> String {
        match self {
            AppError::Terminal(_) | AppError::EventRead(_) => {
                "Run oneterm from an interactive terminal. Try restarting your terminal.".to_string()
            }
            AppError::ThreadSpawn { .. } => "Check system thread limits (ulimit -u).".to_string(),
            AppError::SignalSetup(_) => "Check process signal permissions.".to_string(),
            AppError::Session(e) => e.suggestion(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::ThreadSpawn { .. } => true,
            AppError::Session(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Converts to UNIX sysexits.h-compliant exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Terminal(_) | AppError::EventRead(_) => 74, // EX_IOERR
            AppError::ThreadSpawn { .. } | AppError::SignalSetup(_) => 71, // EX_OSERR
            AppError::Session(SessionError::Pty(_)) => 69, // EX_UNAVAILABLE
            AppError::Session(_) => 70,                    // EX_SOFTWARE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oneterm_terminal::PtyError;

    #[test]
    fn test_spawn_failure_maps_to_unavailable() {
        let err = AppError::from(SessionError::from(PtyError::Spawn("no such file".into())));
        assert_eq!(err.exit_code(), 69);
        assert_eq!(err.context()["operation"], "spawn");
        assert!(err.suggestion().contains("ONETERM_SHELL"));
    }

    #[test]
    fn test_terminal_error_context() {
        let err = AppError::from(io::Error::new(io::ErrorKind::Other, "not a tty"));
        assert_eq!(err.exit_code(), 74);
        assert_eq!(err.context()["operation"], "terminal");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_thread_spawn_is_retryable() {
        let err = AppError::ThreadSpawn {
            name: "input".into(),
            reason: "EAGAIN".into(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.context()["thread"], "input");
    }
}
