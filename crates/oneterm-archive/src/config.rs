use std::env;
use std::path::PathBuf;

const APP_DIR_NAME: &str = ".oneterm";
const LOG_DIR_NAME: &str = "logs";

/// Per-user application directory (`<home>/.oneterm`).
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(APP_DIR_NAME)
}

/// Logical processor count, never less than one.
pub fn detected_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub log_dir: PathBuf,
    /// Fixed worker count; `None` sizes the pool to the host.
    pub workers: Option<usize>,
    pub archive_on_exit: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ArchiveConfig {
    pub fn from_env() -> Self {
        Self {
            log_dir: env::var_os("ONETERM_LOG_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| app_dir().join(LOG_DIR_NAME)),
            workers: env::var("ONETERM_ARCHIVE_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0),
            archive_on_exit: env::var("ONETERM_ARCHIVE_ON_EXIT")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_archive_on_exit(mut self, enabled: bool) -> Self {
        self.archive_on_exit = enabled;
        self
    }

    /// Worker count the pool is built with.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(detected_parallelism).max(1)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let config = ArchiveConfig::default()
            .with_log_dir("/tmp/oneterm-test-logs")
            .with_workers(4)
            .with_archive_on_exit(true);

        assert_eq!(config.log_dir, PathBuf::from("/tmp/oneterm-test-logs"));
        assert_eq!(config.worker_count(), 4);
        assert!(config.archive_on_exit);
    }

    #[test]
    fn test_worker_count_minimum_one() {
        let config = ArchiveConfig::default().with_workers(0);
        assert_eq!(config.worker_count(), 1);
    }

    #[test]
    fn test_detected_parallelism_positive() {
        assert!(detected_parallelism() >= 1);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_app_dir_is_hidden_oneterm_dir() {
        assert!(app_dir().ends_with(".oneterm"));
    }
}
