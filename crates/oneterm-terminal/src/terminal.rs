use vt100::Parser;

use crate::clipboard::Clipboard;
use crate::error::ClipboardError;
use crate::scrollback::ScrollbackLog;
use crate::scrollback::TerminalEvent;

/// Capabilities scrollback capture needs from a terminal view.
pub trait TerminalWidget: Send {
    /// Entire history plus the visible screen as plain text, or `None` when
    /// the widget cannot read its buffer directly.
    fn full_buffer_text(&self) -> Option<String>;

    fn select_all(&mut self);

    /// Places the current selection on the clipboard.
    fn copy_selection(&self, clipboard: &dyn Clipboard) -> Result<(), ClipboardError>;

    fn unselect_all(&mut self);

    fn has_selection(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub row: u16,
    pub col: u16,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    All,
}

/// Screen emulation plus plain-text history for one session.
///
/// `vt100` renders the visible grid; the [`ScrollbackLog`] keeps every
/// line the shell printed, bounded by the scrollback limit.
pub struct VirtualTerminal {
    parser: Parser,
    log: ScrollbackLog,
    cols: u16,
    rows: u16,
    scrollback_lines: usize,
    selection: Option<Selection>,
    range_reads: bool,
    title: Option<String>,
    cwd_uri: Option<String>,
}

impl VirtualTerminal {
    pub fn new(cols: u16, rows: u16, scrollback_lines: usize) -> Self {
        Self {
            parser: Parser::new(rows, cols, 0),
            log: ScrollbackLog::new(history_limit(scrollback_lines, rows)),
            cols,
            rows,
            scrollback_lines,
            selection: None,
            range_reads: true,
            title: None,
            cwd_uri: None,
        }
    }

    /// Feeds shell output; returns title and directory changes it carried.
    pub fn process(&mut self, data: &[u8]) -> Vec<TerminalEvent> {
        self.parser.process(data);
        let events = self.log.feed(data);
        for event in &events {
            match event {
                TerminalEvent::TitleChanged(title) => {
                    self.title = Some(title.clone()).filter(|t| !t.is_empty());
                }
                TerminalEvent::DirectoryChanged(uri) => {
                    self.cwd_uri = Some(uri.clone());
                }
            }
        }
        events
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn cwd_uri(&self) -> Option<&str> {
        self.cwd_uri.as_deref()
    }

    pub fn screen_text(&self) -> String {
        let screen = self.parser.screen();

        let mut lines: Vec<String> = screen
            .rows(0, self.cols)
            .map(|row| row.trim_end().to_string())
            .collect();

        while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
            lines.pop();
        }

        lines.join("\n")
    }

    /// Visible rows with their attributes, as escape sequences to replay.
    pub fn rows_formatted(&self) -> Vec<Vec<u8>> {
        self.parser.screen().rows_formatted(0, self.cols).collect()
    }

    pub fn cursor(&self) -> CursorPosition {
        let screen = self.parser.screen();
        let (row, col) = screen.cursor_position();

        CursorPosition {
            row,
            col,
            visible: !screen.hide_cursor(),
        }
    }

    /// Whether the shell enabled bracketed paste.
    pub fn bracketed_paste(&self) -> bool {
        self.parser.screen().bracketed_paste()
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.parser.set_size(rows, cols);
        self.cols = cols;
        self.rows = rows;
        self.log
            .set_max_lines(history_limit(self.scrollback_lines, rows));
    }

    pub fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    /// Lines kept beyond the visible screen. Zero keeps only what fits on screen.
    pub fn set_scrollback_limit(&mut self, lines: usize) {
        self.scrollback_lines = lines;
        self.log.set_max_lines(history_limit(lines, self.rows));
    }

    pub fn scrollback_limit(&self) -> usize {
        self.scrollback_lines
    }

    /// Enables or hides direct buffer reads, for widgets that lack them.
    pub fn set_range_reads(&mut self, enabled: bool) {
        self.range_reads = enabled;
    }

    pub fn supports_range_reads(&self) -> bool {
        self.range_reads
    }

    pub fn history_text(&self) -> String {
        self.log.text()
    }

    pub fn selected_text(&self) -> Option<String> {
        match self.selection {
            Some(Selection::All) => Some(self.log.text()),
            None => None,
        }
    }
}

impl TerminalWidget for VirtualTerminal {
    fn full_buffer_text(&self) -> Option<String> {
        if self.range_reads {
            Some(self.log.text())
        } else {
            None
        }
    }

    fn select_all(&mut self) {
        self.selection = Some(Selection::All);
    }

    fn copy_selection(&self, clipboard: &dyn Clipboard) -> Result<(), ClipboardError> {
        match self.selected_text() {
            Some(text) => clipboard.set_text(&text),
            None => Ok(()),
        }
    }

    fn unselect_all(&mut self) {
        self.selection = None;
    }

    fn has_selection(&self) -> bool {
        self.selection.is_some()
    }
}

fn history_limit(scrollback_lines: usize, rows: u16) -> usize {
    scrollback_lines.saturating_add(rows as usize)
}
