//! Everything the UI loop reacts to arrives as a [`UiEvent`] on one channel.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;
use crossterm::event;
use crossterm::event::Event;
use crossterm::event::KeyEvent;
use tracing::debug;
use tracing::warn;

use oneterm_session::SessionId;
use oneterm_terminal::PtyReader;

use crate::error::AppError;

const INPUT_POLL: Duration = Duration::from_millis(100);
const READ_CHUNK: usize = 16 * 1024;

#[derive(Debug)]
pub enum UiEvent {
    Key(KeyEvent),
    /// Text pasted into the host terminal.
    Paste(String),
    Resize { cols: u16, rows: u16 },
    Output { id: SessionId, data: Vec<u8> },
    /// The session's output ended; its shell is gone.
    Exited { id: SessionId },
    /// Clipboard contents fetched for a paste into `id`.
    ClipboardText { id: SessionId, text: String },
    Status(String),
    InputFailed(String),
}

/// Reads host terminal events until `shutdown` is set or the loop hangs up.
pub fn spawn_input_thread(
    tx: Sender<UiEvent>,
    shutdown: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, AppError> {
    thread::Builder::new()
        .name("input".to_string())
        .spawn(move || {
            while !shutdown.load(Ordering::SeqCst) {
                let ready = match event::poll(INPUT_POLL) {
                    Ok(ready) => ready,
                    Err(e) => {
                        if tx.send(UiEvent::InputFailed(e.to_string())).is_err() {
                            debug!(error = %e, "UI loop gone; input failure dropped");
                        }
                        break;
                    }
                };
                if !ready {
                    continue;
                }

                let ui_event = match event::read() {
                    Ok(Event::Key(key)) => UiEvent::Key(key),
                    Ok(Event::Paste(text)) => UiEvent::Paste(text),
                    Ok(Event::Resize(cols, rows)) => UiEvent::Resize { cols, rows },
                    Ok(_) => continue,
                    Err(e) => UiEvent::InputFailed(e.to_string()),
                };
                let failed = matches!(ui_event, UiEvent::InputFailed(_));
                if tx.send(ui_event).is_err() || failed {
                    break;
                }
            }
            debug!("Input thread stopped");
        })
        .map_err(|e| AppError::ThreadSpawn {
            name: "input".to_string(),
            reason: e.to_string(),
        })
}

/// Forwards one session's PTY output, then reports its exit.
pub fn spawn_reader(
    id: SessionId,
    mut reader: PtyReader,
    tx: Sender<UiEvent>,
) -> Result<JoinHandle<()>, AppError> {
    let name = format!("pty-{}", id);
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            let mut buf = vec![0u8; READ_CHUNK];
            loop {
                match reader.read_chunk(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        let output = UiEvent::Output {
                            id: id.clone(),
                            data: buf[..n].to_vec(),
                        };
                        if tx.send(output).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(session_id = %id, error = %e, "PTY read failed");
                        break;
                    }
                }
            }
            debug!(session_id = %id, "PTY output ended");
            if tx.send(UiEvent::Exited { id }).is_err() {
                debug!("UI loop gone; exit notice dropped");
            }
        })
        .map_err(|e| AppError::ThreadSpawn {
            name,
            reason: e.to_string(),
        })
}
