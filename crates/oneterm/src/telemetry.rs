use std::io::IsTerminal;
use std::path::Path;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use oneterm_archive::app_dir;

const LOG_FILE_NAME: &str = "oneterm.log";

#[derive(Debug)]
pub struct TelemetryGuard {
    _guard: Option<WorkerGuard>,
}

impl TelemetryGuard {
    fn disabled() -> Self {
        Self { _guard: None }
    }
}

/// Where diagnostic output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

/// Picks the log destination. The UI owns the terminal, so an interactive
/// stderr is never written to.
pub fn log_target(env_path: Option<PathBuf>, stderr_is_terminal: bool, app_dir: &Path) -> LogTarget {
    match env_path {
        Some(path) => LogTarget::File(path),
        None if !stderr_is_terminal => LogTarget::Stderr,
        None => LogTarget::File(app_dir.join(LOG_FILE_NAME)),
    }
}

pub fn init_tracing(default_level: &str) -> TelemetryGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let target = log_target(
        log_file_path_from_env(),
        std::io::stderr().is_terminal(),
        &app_dir(),
    );

    let (writer, guard, ansi) = match target {
        LogTarget::File(path) => match open_log_file(&path) {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                (BoxMakeWriter::new(non_blocking), Some(guard), false)
            }
            Err(err) => {
                eprintln!(
                    "Warning: failed to open log file {}: {}",
                    path.display(),
                    err
                );
                (BoxMakeWriter::new(std::io::sink), None, false)
            }
        },
        LogTarget::Stderr => (BoxMakeWriter::new(std::io::stderr), None, false),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_ansi(ansi)
        .with_writer(writer);

    if subscriber.try_init().is_err() {
        return TelemetryGuard::disabled();
    }

    TelemetryGuard { _guard: guard }
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}

fn log_file_path_from_env() -> Option<PathBuf> {
    std::env::var_os("ONETERM_LOG")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_path_wins() {
        let target = log_target(Some("/tmp/x.log".into()), true, Path::new("/home/a/.oneterm"));
        assert_eq!(target, LogTarget::File("/tmp/x.log".into()));
    }

    #[test]
    fn test_redirected_stderr_is_used() {
        let target = log_target(None, false, Path::new("/home/a/.oneterm"));
        assert_eq!(target, LogTarget::Stderr);
    }

    #[test]
    fn test_interactive_stderr_falls_back_to_app_dir() {
        let target = log_target(None, true, Path::new("/home/a/.oneterm"));
        assert_eq!(
            target,
            LogTarget::File("/home/a/.oneterm/oneterm.log".into())
        );
    }

    #[test]
    fn test_open_log_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("oneterm.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }
}
