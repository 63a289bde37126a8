use std::io;
use std::io::Write;

use crossterm::cursor;
use crossterm::queue;
use crossterm::style::Attribute;
use crossterm::style::Print;
use crossterm::style::SetAttribute;
use crossterm::terminal::Clear;
use crossterm::terminal::ClearType;
use crossterm::terminal::SetTitle;

use oneterm_terminal::VirtualTerminal;

/// Rows taken by the tab bar.
pub const CHROME_ROWS: u16 = 1;

/// What the tab bar shows.
#[derive(Debug, Default)]
pub struct Chrome<'a> {
    pub window_index: usize,
    pub window_count: usize,
    pub tabs: &'a [String],
    pub active: usize,
    pub status: Option<&'a str>,
    pub prefix_pending: bool,
}

/// Host rows left for the shell.
pub fn content_rows(host_rows: u16) -> u16 {
    host_rows.saturating_sub(CHROME_ROWS).max(1)
}

/// One line of tabs, the active one bracketed, with the status right-aligned.
pub fn tab_bar(chrome: &Chrome<'_>, cols: u16) -> String {
    let width = cols as usize;
    let mut bar = String::new();

    if chrome.window_count > 1 {
        bar.push_str(&format!("{}/{} ", chrome.window_index + 1, chrome.window_count));
    }

    for (i, title) in chrome.tabs.iter().enumerate() {
        if i == chrome.active {
            bar.push_str(&format!("[{}] ", title));
        } else {
            bar.push_str(&format!(" {}  ", title));
        }
    }

    let status = if chrome.prefix_pending {
        Some("^\\")
    } else {
        chrome.status
    };

    let mut bar: String = bar.chars().take(width).collect();
    let used = bar.chars().count();
    if let Some(status) = status {
        let status_len = status.chars().count();
        if used + status_len < width {
            bar.push_str(&" ".repeat(width - used - status_len));
            bar.push_str(status);
        }
    }

    let used = bar.chars().count();
    bar.push_str(&" ".repeat(width.saturating_sub(used)));
    bar
}

/// Paints the tab bar and the active session's screen.
pub fn draw<W: Write>(
    out: &mut W,
    chrome: &Chrome<'_>,
    terminal: &VirtualTerminal,
    window_title: &str,
    cols: u16,
) -> io::Result<()> {
    queue!(
        out,
        SetTitle(window_title),
        cursor::Hide,
        cursor::MoveTo(0, 0),
        SetAttribute(Attribute::Reverse),
        Print(tab_bar(chrome, cols)),
        SetAttribute(Attribute::Reset),
    )?;

    for (i, row) in terminal.rows_formatted().iter().enumerate() {
        queue!(
            out,
            cursor::MoveTo(0, i as u16 + CHROME_ROWS),
            Clear(ClearType::UntilNewLine)
        )?;
        out.write_all(row)?;
        out.write_all(b"\x1b[m")?;
    }

    let position = terminal.cursor();
    queue!(
        out,
        cursor::MoveTo(position.col, position.row + CHROME_ROWS)
    )?;
    if position.visible {
        queue!(out, cursor::Show)?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_active_tab_is_bracketed() {
        let tabs = titles(&["ana@/home", "vim"]);
        let chrome = Chrome {
            window_count: 1,
            tabs: &tabs,
            active: 1,
            ..Default::default()
        };
        let bar = tab_bar(&chrome, 40);
        assert!(bar.starts_with(" ana@/home  [vim]"));
        assert_eq!(bar.chars().count(), 40);
    }

    #[test]
    fn test_window_counter_only_with_several_windows() {
        let tabs = titles(&["a"]);
        let chrome = Chrome {
            window_index: 1,
            window_count: 3,
            tabs: &tabs,
            ..Default::default()
        };
        assert!(tab_bar(&chrome, 20).starts_with("2/3 [a]"));
    }

    #[test]
    fn test_status_right_aligned() {
        let tabs = titles(&["a"]);
        let chrome = Chrome {
            window_count: 1,
            tabs: &tabs,
            status: Some("archived"),
            ..Default::default()
        };
        let bar = tab_bar(&chrome, 30);
        assert!(bar.ends_with("archived"));
        assert_eq!(bar.chars().count(), 30);
    }

    #[test]
    fn test_prefix_indicator_replaces_status() {
        let tabs = titles(&["a"]);
        let chrome = Chrome {
            window_count: 1,
            tabs: &tabs,
            status: Some("archived"),
            prefix_pending: true,
            ..Default::default()
        };
        assert!(tab_bar(&chrome, 30).ends_with("^\\"));
    }

    #[test]
    fn test_narrow_bar_is_truncated() {
        let tabs = titles(&["a-very-long-title", "another"]);
        let chrome = Chrome {
            window_count: 1,
            tabs: &tabs,
            status: Some("status"),
            ..Default::default()
        };
        assert_eq!(tab_bar(&chrome, 10).chars().count(), 10);
    }

    #[test]
    fn test_draw_writes_screen_and_title() {
        let mut terminal = VirtualTerminal::new(20, 3, 10);
        terminal.process(b"hello");
        let tabs = titles(&["sh"]);
        let chrome = Chrome {
            window_count: 1,
            tabs: &tabs,
            ..Default::default()
        };

        let mut out = Vec::new();
        draw(&mut out, &chrome, &terminal, "sh", 20).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("hello"));
        assert!(text.contains("[sh]"));
        // Cursor sits after "hello" on the first content row.
        assert!(text.contains("\x1b[2;6H"));
    }

    #[test]
    fn test_content_rows() {
        assert_eq!(content_rows(24), 23);
        assert_eq!(content_rows(1), 1);
        assert_eq!(content_rows(0), 1);
    }
}
