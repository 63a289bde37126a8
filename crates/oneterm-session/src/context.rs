//! Process-wide application context.
//!
//! Owns the archiver, the clipboard service and the background runtime that
//! clipboard reads resume on. Built once in `main` and passed by reference;
//! [`AppContext::shutdown`] must run on every exit path.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tracing::debug;
use tracing::info;

use oneterm_archive::Archiver;
use oneterm_archive::ArchiverStats;
use oneterm_common::mutex_lock_or_recover;
use oneterm_terminal::Clipboard;
use oneterm_terminal::SystemClipboard;

use crate::capture::ScrollbackCapture;
use crate::config::AppConfig;
use crate::config::CaptureMode;
use crate::error::SessionError;

const RUNTIME_WORKERS: usize = 2;
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

pub struct AppContext {
    config: AppConfig,
    archiver: Arc<Archiver>,
    clipboard: Arc<dyn Clipboard>,
    capture: ScrollbackCapture,
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    scrollback_enabled: AtomicBool,
    shut_down: AtomicBool,
}

impl AppContext {
    pub fn init(config: AppConfig) -> Result<Self, SessionError> {
        Self::with_clipboard(config, Arc::new(SystemClipboard::new()))
    }

    pub fn with_clipboard(
        config: AppConfig,
        clipboard: Arc<dyn Clipboard>,
    ) -> Result<Self, SessionError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(RUNTIME_WORKERS)
            .thread_name("oneterm-clipboard")
            .enable_time()
            .build()
            .map_err(|e| SessionError::Runtime(e.to_string()))?;
        let handle = runtime.handle().clone();
        let archiver = Arc::new(Archiver::new(config.archive.clone()));
        let capture = ScrollbackCapture::new(
            Arc::clone(&archiver),
            Arc::clone(&clipboard),
            handle.clone(),
        );

        debug!(
            log_dir = %archiver.log_dir().display(),
            capture = ?config.capture,
            scrollback_lines = config.scrollback_lines,
            "Application context ready"
        );

        Ok(Self {
            config,
            archiver,
            clipboard,
            capture,
            runtime: Mutex::new(Some(runtime)),
            handle,
            scrollback_enabled: AtomicBool::new(true),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn archiver(&self) -> &Arc<Archiver> {
        &self.archiver
    }

    pub fn clipboard(&self) -> &Arc<dyn Clipboard> {
        &self.clipboard
    }

    pub fn runtime_handle(&self) -> &Handle {
        &self.handle
    }

    /// Scrollback capture sharing this context's clipboard gate.
    pub fn capture(&self) -> ScrollbackCapture {
        self.capture.clone()
    }

    pub fn scrollback_enabled(&self) -> bool {
        self.scrollback_enabled.load(Ordering::Relaxed)
    }

    /// Flips the scrollback setting and returns the new state.
    pub fn toggle_scrollback(&self) -> bool {
        let enabled = !self.scrollback_enabled.fetch_xor(true, Ordering::Relaxed);
        info!(enabled, "Scrollback toggled");
        enabled
    }

    /// History lines each session keeps beyond its visible rows.
    pub fn scrollback_limit(&self) -> usize {
        if self.scrollback_enabled() {
            self.config.scrollback_lines
        } else {
            0
        }
    }

    /// Whether sessions expose direct buffer reads to the capture path.
    pub fn range_reads(&self) -> bool {
        self.config.capture == CaptureMode::Direct
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Stops the clipboard runtime, then drains and stops the archiver.
    ///
    /// Clipboard continuations still running get the timeout to submit
    /// before the queue closes. Concurrent callers block until the drain
    /// is done; later calls return the final stats.
    pub fn shutdown(&self) -> ArchiverStats {
        // Held until the archiver has drained.
        let mut runtime = mutex_lock_or_recover(&self.runtime);
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return self.archiver.stats();
        }

        if let Some(runtime) = runtime.take() {
            runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
        }

        let stats = self.archiver.shutdown();
        debug!("Application context shut down");
        stats
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
