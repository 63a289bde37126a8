//! Filesystem seam for the compression worker.
//!
//! Everything the worker does to the disk goes through [`ArchiveStore`],
//! so tests can inject a failure at any single step and check that no
//! partial archive ever appears at the destination.

use std::fs::DirBuilder;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

const TEMP_RANDOM_CHARS: usize = 6;

/// An open temp file the compressed frame is streamed into.
pub trait ArchiveSink: Write + Send {
    fn path(&self) -> &Path;

    /// Forces written bytes to stable storage.
    fn sync_all(&mut self) -> io::Result<()>;
}

pub trait ArchiveStore: Send + Sync {
    /// Creates `dir` and any missing parents, owner-only. Idempotent.
    fn ensure_dir(&self, dir: &Path) -> io::Result<()>;

    /// Creates a uniquely named temp file in the destination's directory.
    fn create_temp(&self, destination: &Path) -> io::Result<Box<dyn ArchiveSink>>;

    /// Atomically moves a closed temp file onto the destination.
    fn commit(&self, temp: &Path, destination: &Path) -> io::Result<()>;

    /// Removes a temp file after a failed attempt. Best effort.
    fn discard(&self, temp: &Path);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DiskStore;

impl DiskStore {
    pub fn new() -> Self {
        Self
    }
}

struct DiskSink {
    file: File,
    path: PathBuf,
}

impl Write for DiskSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl ArchiveSink for DiskSink {
    fn path(&self) -> &Path {
        &self.path
    }

    fn sync_all(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }
}

impl ArchiveStore for DiskStore {
    fn ensure_dir(&self, dir: &Path) -> io::Result<()> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(dir)
    }

    fn create_temp(&self, destination: &Path) -> io::Result<Box<dyn ArchiveSink>> {
        let dir = parent_dir(destination);
        let file_name = destination
            .file_name()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name")
            })?
            .to_string_lossy();

        let temp = tempfile::Builder::new()
            .prefix(&format!("{}.", file_name))
            .rand_bytes(TEMP_RANDOM_CHARS)
            .make_in(dir, open_temp)?;
        let (file, path) = temp.keep().map_err(|e| e.error)?;

        Ok(Box::new(DiskSink { file, path }))
    }

    fn commit(&self, temp: &Path, destination: &Path) -> io::Result<()> {
        std::fs::rename(temp, destination)?;
        sync_dir(parent_dir(destination));
        Ok(())
    }

    fn discard(&self, temp: &Path) {
        if let Err(e) = std::fs::remove_file(temp) {
            if e.kind() != io::ErrorKind::NotFound {
                debug!(path = %temp.display(), error = %e, "Failed to remove temp archive");
            }
        }
    }
}

/// Write-only, exclusive create, owner-only.
fn open_temp(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

/// Parent directory of a path; `.` for bare file names.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    // Persists the rename itself; failure leaves a valid file, only less durable.
    match File::open(dir).and_then(|d| d.sync_all()) {
        Ok(()) => {}
        Err(e) => debug!(dir = %dir.display(), error = %e, "Directory fsync failed"),
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
