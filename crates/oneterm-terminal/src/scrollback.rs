//! Plain-text history of everything a shell printed.
//!
//! The log sees the same byte stream as the screen emulator but keeps only
//! text: escape sequences are dropped, carriage returns and backspaces
//! overwrite within the current line, and output on the alternate screen
//! (full-screen programs) is not recorded. OSC title and working-directory
//! reports are surfaced as [`TerminalEvent`]s.

use std::collections::VecDeque;

use vte::Params;
use vte::Parser;
use vte::Perform;

const TAB_WIDTH: usize = 8;

/// Shell-reported state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// OSC 0 / OSC 2. An empty string clears the title.
    TitleChanged(String),
    /// OSC 7, the raw `file://host/path` URI.
    DirectoryChanged(String),
}

pub struct ScrollbackLog {
    parser: Parser,
    history: History,
}

/// The `vte` performer: text lines plus the cursor column on the open line.
struct History {
    lines: VecDeque<String>,
    current: Vec<char>,
    col: usize,
    max_lines: usize,
    alt_screen: bool,
    events: Vec<TerminalEvent>,
}

impl ScrollbackLog {
    /// `max_lines` bounds completed lines kept; older lines are dropped.
    pub fn new(max_lines: usize) -> Self {
        Self {
            parser: Parser::new(),
            history: History {
                lines: VecDeque::new(),
                current: Vec::new(),
                col: 0,
                max_lines,
                alt_screen: false,
                events: Vec::new(),
            },
        }
    }

    pub fn max_lines(&self) -> usize {
        self.history.max_lines
    }

    pub fn set_max_lines(&mut self, max_lines: usize) {
        self.history.max_lines = max_lines;
        self.history.trim();
    }

    /// Completed lines currently held.
    pub fn line_count(&self) -> usize {
        self.history.lines.len()
    }

    pub fn in_alt_screen(&self) -> bool {
        self.history.alt_screen
    }

    pub fn clear(&mut self) {
        self.history.lines.clear();
        self.history.current.clear();
        self.history.col = 0;
    }

    /// Full history as text, one `\n`-terminated line per row, trailing
    /// blanks trimmed. A partial last line has no terminator.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for line in &self.history.lines {
            out.push_str(line);
            out.push('\n');
        }
        let partial: String = self.history.current.iter().collect();
        out.push_str(partial.trim_end());
        out
    }

    pub fn feed(&mut self, data: &[u8]) -> Vec<TerminalEvent> {
        for &byte in data {
            self.parser.advance(&mut self.history, byte);
        }
        std::mem::take(&mut self.history.events)
    }
}

impl History {
    fn put(&mut self, c: char) {
        if self.alt_screen {
            return;
        }
        if self.col < self.current.len() {
            self.current[self.col] = c;
        } else {
            self.current.resize(self.col, ' ');
            self.current.push(c);
        }
        self.col += 1;
    }

    fn newline(&mut self) {
        self.col = 0;
        if self.alt_screen {
            return;
        }
        let line: String = self.current.drain(..).collect();
        self.lines.push_back(line.trim_end().to_string());
        self.trim();
    }

    fn trim(&mut self) {
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }
}

/// First parameter, with 0 and absent both meaning `default`.
fn first_param(params: &Params, default: usize) -> usize {
    match params.iter().next().and_then(|p| p.first()) {
        Some(&n) if n > 0 => n as usize,
        _ => default,
    }
}

impl Perform for History {
    fn print(&mut self, c: char) {
        if c != '\u{7f}' {
            self.put(c);
        }
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' => self.newline(),
            b'\r' => self.col = 0,
            0x08 => self.col = self.col.saturating_sub(1),
            b'\t' => {
                let next = (self.col / TAB_WIDTH + 1) * TAB_WIDTH;
                while self.col < next {
                    self.put(' ');
                }
            }
            _ => {}
        }
    }

    fn csi_dispatch(
        &mut self,
        params: &Params,
        intermediates: &[u8],
        _ignore: bool,
        action: char,
    ) {
        let private = intermediates.first() == Some(&b'?');

        match (private, action) {
            (true, 'h') | (true, 'l') => {
                if params
                    .iter()
                    .any(|p| matches!(p.first(), Some(47) | Some(1047) | Some(1049)))
                {
                    self.alt_screen = action == 'h';
                }
            }
            // Erase in line: only "to end of line" changes recorded text.
            (false, 'K') if first_param(params, 0) == 0 => {
                self.current.truncate(self.col);
            }
            (false, 'G') => self.col = first_param(params, 1) - 1,
            (false, 'C') => self.col += first_param(params, 1),
            (false, 'D') => self.col = self.col.saturating_sub(first_param(params, 1)),
            _ => {}
        }
    }

    fn osc_dispatch(&mut self, params: &[&[u8]], _bell_terminated: bool) {
        let Some((command, rest)) = params.split_first() else {
            return;
        };
        if rest.is_empty() {
            return;
        }
        // vte splits on ';', which titles may contain.
        let value = rest
            .iter()
            .map(|part| String::from_utf8_lossy(part))
            .collect::<Vec<_>>()
            .join(";");

        match *command {
            b"0" | b"2" => self.events.push(TerminalEvent::TitleChanged(value)),
            b"7" => self.events.push(TerminalEvent::DirectoryChanged(value)),
            _ => {}
        }
    }
}
