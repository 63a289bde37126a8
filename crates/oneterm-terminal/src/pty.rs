use std::io;
use std::io::Read;
use std::io::Write;
use std::sync::Mutex;

use portable_pty::native_pty_system;
use portable_pty::Child;
use portable_pty::CommandBuilder;
use portable_pty::MasterPty;
use portable_pty::PtySize;
use tracing::debug;

use oneterm_common::mutex_lock_or_recover;

use crate::error::PtyError;

const TERM: &str = "xterm-256color";

/// How the shell ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    pub code: u32,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

impl From<portable_pty::ExitStatus> for ExitStatus {
    fn from(status: portable_pty::ExitStatus) -> Self {
        Self {
            code: status.exit_code(),
        }
    }
}

/// Owns the master side of a PTY and the shell running on it.
///
/// Output is read through the [`PtyReader`] returned by [`PtyHandle::spawn`],
/// normally on a dedicated thread.
pub struct PtyHandle {
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    writer: Mutex<Box<dyn Write + Send>>,
    size: PtySize,
}

/// Blocking reader for PTY output. Reaches end of stream once the shell
/// side of the PTY is closed.
pub struct PtyReader {
    reader: Box<dyn Read + Send>,
}

impl Drop for PtyHandle {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.kill();
        }
    }
}

impl PtyHandle {
    pub fn spawn(
        shell: &str,
        args: &[String],
        env: &[(String, String)],
        cols: u16,
        rows: u16,
    ) -> Result<(Self, PtyReader), PtyError> {
        let pty_system = native_pty_system();

        let size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        let pair = pty_system
            .openpty(size)
            .map_err(|e| PtyError::Open(e.to_string()))?;

        let mut cmd = CommandBuilder::new(shell);
        cmd.args(args);
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }
        for (key, value) in env {
            cmd.env(key, value);
        }
        cmd.env("TERM", TERM);

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::Spawn(e.to_string()))?;
        // Only the child keeps the slave open, so reads end when it exits.
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::Open(e.to_string()))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::Open(e.to_string()))?;

        debug!(shell, pid = ?child.process_id(), cols, rows, "Shell spawned");

        Ok((
            Self {
                master: pair.master,
                child,
                writer: Mutex::new(writer),
                size,
            },
            PtyReader { reader },
        ))
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.process_id()
    }

    pub fn is_running(&mut self) -> bool {
        self.child
            .try_wait()
            .map(|status| status.is_none())
            .unwrap_or(false)
    }

    /// Exit status if the shell has already exited.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>, PtyError> {
        self.child
            .try_wait()
            .map(|status| status.map(ExitStatus::from))
            .map_err(|e| PtyError::Wait(e.to_string()))
    }

    pub fn wait(&mut self) -> Result<ExitStatus, PtyError> {
        self.child
            .wait()
            .map(ExitStatus::from)
            .map_err(|e| PtyError::Wait(e.to_string()))
    }

    pub fn write(&self, data: &[u8]) -> Result<(), PtyError> {
        if data.is_empty() {
            return Ok(());
        }

        let mut writer = mutex_lock_or_recover(&self.writer);
        let mut offset = 0;
        while offset < data.len() {
            match writer.write(&data[offset..]) {
                Ok(0) => {
                    return Err(PtyError::Write(
                        "write returned 0 bytes, PTY closed".to_string(),
                    ));
                }
                Ok(n) => offset += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(PtyError::Write(e.to_string())),
            }
        }
        writer.flush().map_err(|e| PtyError::Write(e.to_string()))
    }

    pub fn write_str(&self, s: &str) -> Result<(), PtyError> {
        self.write(s.as_bytes())
    }

    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), PtyError> {
        self.size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };
        self.master
            .resize(self.size)
            .map_err(|e| PtyError::Resize(e.to_string()))
    }

    pub fn size(&self) -> (u16, u16) {
        (self.size.cols, self.size.rows)
    }

    pub fn kill(&mut self) -> Result<(), PtyError> {
        if !self.is_running() {
            return Ok(());
        }

        self.child
            .kill()
            .map_err(|e| PtyError::Spawn(e.to_string()))
    }
}

impl PtyReader {
    /// Reads the next chunk of output. `Ok(0)` means the shell side closed.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, PtyError> {
        loop {
            match self.reader.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_hangup(&e) => return Ok(0),
                Err(e) => return Err(PtyError::Read(e.to_string())),
            }
        }
    }
}

/// Linux reports a closed slave as EIO on the master.
#[cfg(unix)]
fn is_hangup(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::EIO)
}

#[cfg(not(unix))]
fn is_hangup(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::BrokenPipe
}
