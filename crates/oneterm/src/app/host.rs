use std::io;
use std::io::Write;

use crossterm::event::DisableBracketedPaste;
use crossterm::event::EnableBracketedPaste;
use crossterm::event::KeyboardEnhancementFlags;
use crossterm::event::PopKeyboardEnhancementFlags;
use crossterm::event::PushKeyboardEnhancementFlags;
use crossterm::execute;
use crossterm::terminal;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use tracing::debug;

use crate::error::AppError;

/// Restores the host terminal on drop so the user's shell is never left in
/// raw mode.
#[must_use = "HostTerminal must be held while the UI is running"]
pub struct HostTerminal {
    keyboard_enhanced: bool,
}

impl HostTerminal {
    pub fn enter() -> Result<Self, AppError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(
            stdout,
            terminal::EnterAlternateScreen,
            EnableBracketedPaste
        ) {
            let _ = disable_raw_mode();
            return Err(AppError::Terminal(err));
        }

        // Ctrl+Shift bindings are only distinguishable with the kitty protocol.
        let keyboard_enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false)
            && execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
            )
            .is_ok();
        debug!(keyboard_enhanced, "Host terminal entered");

        Ok(Self { keyboard_enhanced })
    }

    pub fn size() -> Result<(u16, u16), AppError> {
        Ok(terminal::size()?)
    }
}

impl Drop for HostTerminal {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        if self.keyboard_enhanced {
            let _ = execute!(stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(stdout, DisableBracketedPaste);
        let _ = disable_raw_mode();
        let _ = execute!(stdout, terminal::LeaveAlternateScreen);
        let _ = stdout.write_all(b"\x1b[0m\x1b(B\x1b[?25h\x1b[?1l\x1b>");
        let _ = stdout.flush();
    }
}
