//! Clipboard service.
//!
//! [`SystemClipboard`] talks to the desktop clipboard through `arboard` and
//! keeps an in-process copy so copy/paste still works in a bare console.
//! [`MemoryClipboard`] is the in-process half on its own.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use tracing::debug;

use oneterm_common::mutex_lock_or_recover;

use crate::error::ClipboardError;

pub trait Clipboard: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError>;

    fn get_text(&self) -> Result<String, ClipboardError>;
}

/// Reads the clipboard off the calling thread.
///
/// Must be awaited inside a tokio runtime; the read itself runs on the
/// blocking pool since desktop clipboards may round-trip to another process.
pub async fn read_text_async(clipboard: Arc<dyn Clipboard>) -> Result<String, ClipboardError> {
    tokio::task::spawn_blocking(move || clipboard.get_text())
        .await
        .map_err(|e| ClipboardError::Access(e.to_string()))?
}

#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: Mutex<String>,
    unavailable: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(text.into()),
            unavailable: false,
        }
    }

    /// A clipboard whose every access fails.
    pub fn unavailable() -> Self {
        Self {
            text: Mutex::new(String::new()),
            unavailable: true,
        }
    }
}

impl Clipboard for MemoryClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        if self.unavailable {
            return Err(ClipboardError::Unavailable("clipboard disabled".to_string()));
        }
        *mutex_lock_or_recover(&self.text) = text.to_string();
        Ok(())
    }

    fn get_text(&self) -> Result<String, ClipboardError> {
        if self.unavailable {
            return Err(ClipboardError::Unavailable("clipboard disabled".to_string()));
        }
        Ok(mutex_lock_or_recover(&self.text).clone())
    }
}

/// The desktop clipboard through `arboard`.
///
/// The handle is created on first use and kept for the life of the
/// service; on X11 the owner must stay alive for other applications to
/// paste what was copied.
#[derive(Default)]
pub struct DesktopClipboard {
    handle: Mutex<Option<arboard::Clipboard>>,
}

impl DesktopClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_handle<T>(
        &self,
        op: impl FnOnce(&mut arboard::Clipboard) -> Result<T, arboard::Error>,
    ) -> Result<T, ClipboardError> {
        let mut guard = mutex_lock_or_recover(&self.handle);
        if guard.is_none() {
            match arboard::Clipboard::new() {
                Ok(cb) => *guard = Some(cb),
                Err(e) => {
                    debug!(error = %e, "arboard clipboard init failed");
                    return Err(ClipboardError::Unavailable(e.to_string()));
                }
            }
        }

        let Some(clipboard) = guard.as_mut() else {
            return Err(ClipboardError::Unavailable("no clipboard".to_string()));
        };
        op(clipboard).map_err(|e| {
            // Recreate on next use; the connection may have gone stale.
            debug!(error = %e, "arboard clipboard access failed");
            *guard = None;
            ClipboardError::Access(e.to_string())
        })
    }
}

impl Clipboard for DesktopClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.with_handle(|cb| cb.set_text(text.to_string()))
    }

    fn get_text(&self) -> Result<String, ClipboardError> {
        self.with_handle(|cb| cb.get_text())
    }
}

/// Desktop clipboard with an in-process fallback.
///
/// Every copy lands in the local slot. Reads come from the desktop unless
/// the last copy failed to reach it, in which case the desktop holds some
/// older owner's text and the local slot is served instead.
pub struct SystemClipboard {
    desktop: Box<dyn Clipboard>,
    local: MemoryClipboard,
    desktop_current: AtomicBool,
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::with_desktop(Box::new(DesktopClipboard::new()))
    }

    pub fn with_desktop(desktop: Box<dyn Clipboard>) -> Self {
        Self {
            desktop,
            local: MemoryClipboard::new(),
            desktop_current: AtomicBool::new(true),
        }
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.local.set_text(text)?;
        let reached = match self.desktop.set_text(text) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "System clipboard copy failed; kept local copy");
                false
            }
        };
        self.desktop_current.store(reached, Ordering::SeqCst);
        Ok(())
    }

    fn get_text(&self) -> Result<String, ClipboardError> {
        if !self.desktop_current.load(Ordering::SeqCst) {
            return self.local.get_text();
        }
        match self.desktop.get_text() {
            Ok(text) => Ok(text),
            Err(e) => {
                debug!(error = %e, "System clipboard read failed; using local copy");
                self.local.get_text()
            }
        }
    }
}
