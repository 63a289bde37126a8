#![deny(clippy::all)]

mod clipboard;
pub mod error;
mod pty;
mod scrollback;
mod terminal;

pub use clipboard::read_text_async;
pub use clipboard::Clipboard;
pub use clipboard::MemoryClipboard;
pub use clipboard::DesktopClipboard;
pub use clipboard::SystemClipboard;
pub use error::ClipboardError;
pub use error::PtyError;
pub use pty::ExitStatus;
pub use pty::PtyHandle;
pub use pty::PtyReader;
pub use scrollback::ScrollbackLog;
pub use scrollback::TerminalEvent;
pub use terminal::CursorPosition;
pub use terminal::TerminalWidget;
pub use terminal::VirtualTerminal;

pub type Result<T> = std::result::Result<T, PtyError>;
