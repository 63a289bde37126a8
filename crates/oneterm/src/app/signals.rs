use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::error::AppError;

/// Sets the shared shutdown flag on SIGINT, SIGTERM or SIGHUP.
pub struct SignalHandler {
    #[allow(dead_code)]
    handle: Option<JoinHandle<()>>,
}

impl SignalHandler {
    #[cfg(unix)]
    pub fn setup(shutdown: Arc<AtomicBool>) -> Result<Self, AppError> {
        use std::sync::atomic::Ordering;

        use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;
        use tracing::info;

        let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])
            .map_err(|e| AppError::SignalSetup(e.to_string()))?;

        let handle = std::thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    info!(signal = sig, "Received signal, initiating graceful shutdown");
                    shutdown.store(true, Ordering::SeqCst);
                }
            })
            .map_err(|e| AppError::SignalSetup(format!("failed to spawn signal handler: {}", e)))?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    #[cfg(not(unix))]
    pub fn setup(_shutdown: Arc<AtomicBool>) -> Result<Self, AppError> {
        Ok(Self { handle: None })
    }
}
