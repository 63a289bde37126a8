use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::Parser;

const LONG_ABOUT: &str = r#"A tabbed terminal that archives scrollback to compressed log files.

Each tab runs your shell ($SHELL -i). Commands are reached with Ctrl+Shift+<key>
where the host terminal reports it, or with the prefix Ctrl+\ followed by <key>:

  B  archive scrollback       A  select all and copy
  C  copy selection           V  paste
  T  new tab                  W  close tab
  ]  next tab                 [  previous tab
  N  new window               O  next window
  S  toggle scrollback        Q  quit

Archives are written to ~/.oneterm/logs/terminal_<date>_<time>.logz as zstd
frames; read them with `zstd -dc <file>`.

ENVIRONMENT:
    ONETERM_SHELL             Shell to start in new tabs
    ONETERM_CAPTURE           direct | clipboard
    ONETERM_SCROLLBACK_LINES  History kept per tab (default 100000)
    ONETERM_LOG_DIR           Archive directory
    ONETERM_ARCHIVE_WORKERS   Compression threads (default: CPU count)
    ONETERM_ARCHIVE_ON_EXIT   Archive a tab's scrollback when it closes
    ONETERM_LOG               Diagnostic log file
    RUST_LOG                  Log filter (e.g. oneterm=debug)"#;

const KNOWN_FLAGS: &[&str] = &["-D", "--debug", "-h", "--help", "-V", "--version"];

#[derive(Parser, Debug, Default, PartialEq, Eq)]
#[command(name = "oneterm")]
#[command(version)]
#[command(about = "Tabbed terminal with compressed scrollback archives")]
#[command(long_about = LONG_ABOUT)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short = 'D', long)]
    pub debug: bool,
}

impl Cli {
    pub fn default_log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

/// Result of lenient argument parsing.
#[derive(Debug)]
pub struct ParsedArgs {
    pub cli: Cli,
    /// Arguments that were not recognized and have been dropped.
    pub ignored: Vec<String>,
}

/// Parses the command line, dropping anything unrecognized.
///
/// Help and version requests come back as `Err`; callers print them with
/// [`clap::Error::exit`].
pub fn parse_lenient<I, T>(args: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

    match Cli::try_parse_from(&args) {
        Ok(cli) => Ok(ParsedArgs {
            cli,
            ignored: Vec::new(),
        }),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => Err(e),
        Err(_) => {
            let (known, ignored): (Vec<OsString>, Vec<OsString>) = args
                .iter()
                .skip(1)
                .cloned()
                .partition(|arg| arg.to_str().is_some_and(|a| KNOWN_FLAGS.contains(&a)));

            let program = args.first().cloned().unwrap_or_else(|| "oneterm".into());
            let cli = Cli::try_parse_from(std::iter::once(program).chain(known))?;
            Ok(ParsedArgs {
                cli,
                ignored: ignored
                    .into_iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_args() {
        let parsed = parse_lenient(["oneterm"]).unwrap();
        assert_eq!(parsed.cli, Cli::default());
        assert!(parsed.ignored.is_empty());
        assert_eq!(parsed.cli.default_log_level(), "info");
    }

    #[test]
    fn test_debug_flag() {
        for flag in ["-D", "--debug"] {
            let parsed = parse_lenient(["oneterm", flag]).unwrap();
            assert!(parsed.cli.debug);
            assert_eq!(parsed.cli.default_log_level(), "debug");
        }
    }

    #[test]
    fn test_unknown_flags_are_dropped() {
        let parsed = parse_lenient(["oneterm", "--frobnicate", "-D", "extra"]).unwrap();
        assert!(parsed.cli.debug);
        assert_eq!(parsed.ignored, vec!["--frobnicate", "extra"]);
    }

    #[test]
    fn test_help_and_version_are_errors_to_print() {
        let help = parse_lenient(["oneterm", "--help"]).unwrap_err();
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);

        let version = parse_lenient(["oneterm", "-V"]).unwrap_err();
        assert_eq!(version.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_help_wins_over_unknown_flags() {
        let err = parse_lenient(["oneterm", "--bogus", "-h"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }
}
