//! Scrollback capture: turns a session's history into an archival job.
//!
//! When the widget can read its buffer, the text is taken directly and
//! submitted on the calling thread. Otherwise the capture goes through the
//! clipboard on the background runtime: select everything, copy, read the
//! clipboard back, then clear the selection and submit. Clipboard failures
//! and blank captures end quietly with nothing archived.
//!
//! The clipboard is one shared slot, so clipboard captures run one at a
//! time: the gate is held from the copy until the read-back completes.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use oneterm_archive::Archiver;
use oneterm_archive::CompressionLevel;
use oneterm_common::mutex_lock_or_recover;
use oneterm_terminal::read_text_async;
use oneterm_terminal::Clipboard;
use oneterm_terminal::ClipboardError;
use oneterm_terminal::TerminalWidget;

use crate::error::SessionError;

#[derive(Debug)]
pub enum CaptureOutcome {
    /// Nothing to archive.
    Empty,
    /// Queued for compression at this path.
    Submitted(PathBuf),
    /// Waiting on the clipboard; resolves to the queued path, if any.
    Pending(JoinHandle<Option<PathBuf>>),
}

/// Cheap to clone; clones share the clipboard gate.
#[derive(Clone)]
pub struct ScrollbackCapture {
    archiver: Arc<Archiver>,
    clipboard: Arc<dyn Clipboard>,
    runtime: Handle,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl ScrollbackCapture {
    pub fn new(archiver: Arc<Archiver>, clipboard: Arc<dyn Clipboard>, runtime: Handle) -> Self {
        Self {
            archiver,
            clipboard,
            runtime,
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Archives a session's scrollback at the interactive level.
    pub fn archive<W>(&self, session: &Arc<Mutex<W>>) -> Result<CaptureOutcome, SessionError>
    where
        W: TerminalWidget + 'static,
    {
        self.archive_at(session, CompressionLevel::INTERACTIVE)
    }

    pub fn archive_at<W>(
        &self,
        session: &Arc<Mutex<W>>,
        level: CompressionLevel,
    ) -> Result<CaptureOutcome, SessionError>
    where
        W: TerminalWidget + 'static,
    {
        let direct = mutex_lock_or_recover(session).full_buffer_text();
        if let Some(text) = direct {
            return match self.archiver.submit_text(text, level)? {
                Some(path) => Ok(CaptureOutcome::Submitted(path)),
                None => Ok(CaptureOutcome::Empty),
            };
        }

        let continuation = self.begin_capture(session, level);
        Ok(CaptureOutcome::Pending(self.runtime.spawn(continuation)))
    }

    /// Returns the clipboard capture for a session: wait for the gate,
    /// select and copy everything, read the clipboard, clear the selection,
    /// and submit.
    ///
    /// The continuation owns a handle to the session, so it stays valid if
    /// the tab closes first. Must run inside a tokio runtime.
    pub fn begin_capture<W>(
        &self,
        session: &Arc<Mutex<W>>,
        level: CompressionLevel,
    ) -> impl Future<Output = Option<PathBuf>> + Send + 'static
    where
        W: TerminalWidget + 'static,
    {
        let session = Arc::clone(session);
        let clipboard = Arc::clone(&self.clipboard);
        let archiver = Arc::clone(&self.archiver);
        let gate = Arc::clone(&self.gate);

        async move {
            let read = {
                let _turn = gate.lock().await;
                let read = match copy_all(Arc::clone(&session), Arc::clone(&clipboard)).await {
                    Ok(()) => read_text_async(clipboard).await,
                    Err(e) => Err(e),
                };
                mutex_lock_or_recover(&session).unselect_all();
                read
            };

            let text = match read {
                Ok(text) => text,
                Err(e) => {
                    debug!(error = %e, "Clipboard capture failed; scrollback not archived");
                    return None;
                }
            };

            match archiver.submit_text(text, level) {
                Ok(path) => path,
                Err(e) => {
                    warn!(error = %e, "Scrollback archive rejected");
                    None
                }
            }
        }
    }
}

/// Selects everything and copies it, on the blocking pool.
async fn copy_all<W>(
    session: Arc<Mutex<W>>,
    clipboard: Arc<dyn Clipboard>,
) -> Result<(), ClipboardError>
where
    W: TerminalWidget + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut widget = mutex_lock_or_recover(&session);
        widget.select_all();
        widget.copy_selection(clipboard.as_ref())
    })
    .await
    .map_err(|e| ClipboardError::Access(e.to_string()))?
}
