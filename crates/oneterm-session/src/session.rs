use std::fmt;

use tracing::debug;
use tracing::warn;
use url::Url;
use uuid::Uuid;

use oneterm_terminal::Clipboard;
use oneterm_terminal::ClipboardError;
use oneterm_terminal::ExitStatus;
use oneterm_terminal::PtyHandle;
use oneterm_terminal::PtyReader;
use oneterm_terminal::TerminalEvent;
use oneterm_terminal::TerminalWidget;
use oneterm_terminal::VirtualTerminal;

use crate::config::ShellCommand;
use crate::error::SessionError;
use crate::registry::Titled;

const PASTE_START: &[u8] = b"\x1b[200~";
const PASTE_END: &[u8] = b"\x1b[201~";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn generate_session_id() -> SessionId {
    SessionId::new(Uuid::new_v4().to_string()[..8].to_string())
}

/// Tab label for a session.
///
/// The shell's own title wins; otherwise `user@<directory>` from the last
/// OSC 7 report, or `user@?` when no directory is known.
pub fn display_title(title: Option<&str>, cwd_uri: Option<&str>, user: &str) -> String {
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        return title.to_string();
    }

    let path = cwd_uri
        .and_then(|uri| Url::parse(uri).ok())
        .filter(|url| url.scheme() == "file")
        .map(|url| percent_decode(url.path()))
        .filter(|path| !path.is_empty());

    match path {
        Some(path) => format!("{}@{}", user, path),
        None => format!("{}@?", user),
    }
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = hex {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// One shell running in one tab.
pub struct Session {
    id: SessionId,
    pty: PtyHandle,
    terminal: VirtualTerminal,
    user: String,
    exit_status: Option<ExitStatus>,
}

impl Session {
    /// Starts `shell` on a new PTY. The returned reader delivers its output.
    pub fn spawn(
        id: SessionId,
        shell: &ShellCommand,
        user: &str,
        cols: u16,
        rows: u16,
        scrollback_lines: usize,
    ) -> Result<(Self, PtyReader), SessionError> {
        let (pty, reader) = PtyHandle::spawn(&shell.program, &shell.args, &shell.env, cols, rows)?;
        debug!(session_id = %id, pid = ?pty.pid(), "Session started");

        Ok((
            Self {
                id,
                pty,
                terminal: VirtualTerminal::new(cols, rows, scrollback_lines),
                user: user.to_string(),
                exit_status: None,
            },
            reader,
        ))
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pty.pid()
    }

    pub fn terminal(&self) -> &VirtualTerminal {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut VirtualTerminal {
        &mut self.terminal
    }

    /// Feeds shell output into the terminal.
    pub fn process_output(&mut self, data: &[u8]) -> Vec<TerminalEvent> {
        self.terminal.process(data)
    }

    /// Sends keyboard input to the shell. Typing drops any selection.
    pub fn send_input(&mut self, data: &[u8]) -> Result<(), SessionError> {
        self.terminal.unselect_all();
        self.pty.write(data)?;
        Ok(())
    }

    /// Sends clipboard text, bracketed when the shell asked for it.
    pub fn paste(&mut self, text: &str) -> Result<(), SessionError> {
        if text.is_empty() {
            return Ok(());
        }
        if self.terminal.bracketed_paste() {
            let mut data = Vec::with_capacity(text.len() + PASTE_START.len() + PASTE_END.len());
            data.extend_from_slice(PASTE_START);
            data.extend_from_slice(text.as_bytes());
            data.extend_from_slice(PASTE_END);
            self.send_input(&data)
        } else {
            self.send_input(text.replace('\n', "\r").as_bytes())
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), SessionError> {
        self.terminal.resize(cols, rows);
        self.pty.resize(cols, rows)?;
        Ok(())
    }

    pub fn set_scrollback_limit(&mut self, lines: usize) {
        self.terminal.set_scrollback_limit(lines);
    }

    pub fn set_range_reads(&mut self, enabled: bool) {
        self.terminal.set_range_reads(enabled);
    }

    /// Collects the shell's exit status once its output has ended.
    pub fn reap(&mut self) -> Option<ExitStatus> {
        if self.exit_status.is_none() {
            match self.pty.wait() {
                Ok(status) => self.exit_status = Some(status),
                Err(e) => warn!(session_id = %self.id, error = %e, "Failed to reap shell"),
            }
        }
        self.exit_status
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    pub fn kill(&mut self) {
        if let Err(e) = self.pty.kill() {
            warn!(session_id = %self.id, error = %e, "Failed to kill shell");
        }
    }

    pub fn display_title(&self) -> String {
        display_title(self.terminal.title(), self.terminal.cwd_uri(), &self.user)
    }
}

impl Titled for Session {
    fn display_title(&self) -> String {
        Session::display_title(self)
    }
}

impl TerminalWidget for Session {
    fn full_buffer_text(&self) -> Option<String> {
        self.terminal.full_buffer_text()
    }

    fn select_all(&mut self) {
        self.terminal.select_all();
    }

    fn copy_selection(&self, clipboard: &dyn Clipboard) -> Result<(), ClipboardError> {
        self.terminal.copy_selection(clipboard)
    }

    fn unselect_all(&mut self) {
        self.terminal.unselect_all();
    }

    fn has_selection(&self) -> bool {
        self.terminal.has_selection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_wins() {
        assert_eq!(
            display_title(Some("vim"), Some("file://h/home/ana"), "ana"),
            "vim"
        );
    }

    #[test]
    fn test_cwd_fallback() {
        assert_eq!(
            display_title(None, Some("file://host/home/ana/src"), "ana"),
            "ana@/home/ana/src"
        );
        assert_eq!(
            display_title(Some(""), Some("file:///tmp"), "ana"),
            "ana@/tmp"
        );
    }

    #[test]
    fn test_cwd_is_percent_decoded() {
        assert_eq!(
            display_title(None, Some("file://host/home/ana/My%20Files"), "ana"),
            "ana@/home/ana/My Files"
        );
    }

    #[test]
    fn test_unknown_directory() {
        assert_eq!(display_title(None, None, "ana"), "ana@?");
        assert_eq!(display_title(None, Some("not a uri"), "ana"), "ana@?");
        assert_eq!(display_title(None, Some("http://x/y"), "ana"), "ana@?");
    }

    #[test]
    fn test_percent_decode_keeps_malformed_escapes() {
        assert_eq!(percent_decode("/a%2"), "/a%2");
        assert_eq!(percent_decode("/a%zz"), "/a%zz");
        assert_eq!(percent_decode("/%41%42"), "/AB");
    }

    #[test]
    fn test_generated_ids_are_short_and_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_eq!(a.as_str().len(), 8);
        assert_ne!(a, b);
    }

    #[cfg(unix)]
    #[test]
    fn test_spawned_session_title_and_exit() {
        let shell = ShellCommand::new("/bin/sh")
            .with_args(["-c", "printf '\\033]7;file://h/srv\\007'; exit 0"]);
        let (mut session, mut reader) =
            Session::spawn(SessionId::new("s1"), &shell, "ana", 80, 24, 100).unwrap();

        let mut buf = [0u8; 1024];
        while let Ok(n) = reader.read_chunk(&mut buf) {
            if n == 0 {
                break;
            }
            session.process_output(&buf[..n]);
        }

        assert_eq!(session.display_title(), "ana@/srv");
        assert_eq!(session.reap().map(|s| s.success()), Some(true));
    }
}
