use std::env;
use std::str::FromStr;

use oneterm_archive::ArchiveConfig;

pub const DEFAULT_SCROLLBACK_LINES: usize = 100_000;
const FALLBACK_SHELL: &str = "/bin/bash";

/// How scrollback is captured for archiving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Read the terminal buffer directly.
    #[default]
    Direct,
    /// Select all, copy, and read the clipboard back.
    Clipboard,
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(CaptureMode::Direct),
            "clipboard" => Ok(CaptureMode::Clipboard),
            other => Err(format!("unknown capture mode '{}'", other)),
        }
    }
}

/// Program and arguments started in every new tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ShellCommand {
    /// An interactive shell: `ONETERM_SHELL`, then `SHELL`, then bash.
    pub fn interactive() -> Self {
        let program = env::var("ONETERM_SHELL")
            .ok()
            .or_else(|| env::var("SHELL").ok())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_SHELL.to_string());
        Self::new(program).with_args(["-i"])
    }

    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub shell: ShellCommand,
    pub capture: CaptureMode,
    pub scrollback_lines: usize,
    /// Login name shown in fallback tab titles.
    pub user: String,
    pub archive: ArchiveConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            shell: ShellCommand::interactive(),
            capture: env::var("ONETERM_CAPTURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            scrollback_lines: env::var("ONETERM_SCROLLBACK_LINES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SCROLLBACK_LINES),
            user: env::var("USER")
                .or_else(|_| env::var("LOGNAME"))
                .ok()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| "user".to_string()),
            archive: ArchiveConfig::from_env(),
        }
    }

    pub fn with_shell(mut self, shell: ShellCommand) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_capture(mut self, capture: CaptureMode) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_scrollback_lines(mut self, lines: usize) -> Self {
        self.scrollback_lines = lines;
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_archive(mut self, archive: ArchiveConfig) -> Self {
        self.archive = archive;
        self
    }
}
