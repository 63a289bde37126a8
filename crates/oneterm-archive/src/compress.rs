use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::info;
use tracing::warn;
use zstd::stream::raw::Encoder;
use zstd::stream::raw::InBuffer;
use zstd::stream::raw::Operation;
use zstd::stream::raw::OutBuffer;

use crate::error::ArchiveError;
use crate::job::ArchivalJob;
use crate::store::parent_dir;
use crate::store::ArchiveSink;
use crate::store::ArchiveStore;
use crate::Result;

/// Size of the encoder output buffer; each filled chunk is written out at once.
pub const CHUNK_SIZE: usize = 32 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub destination: PathBuf,
    pub input_bytes: u64,
    pub compressed_bytes: u64,
}

/// Compresses one job into its destination.
///
/// The frame is streamed into a temp file beside the destination, which is
/// flushed, synced, closed and then renamed over the destination. On any
/// failure the temp file is removed and the destination is left untouched.
pub fn write_archive(job: &ArchivalJob, store: &dyn ArchiveStore) -> Result<ArchiveReport> {
    let level = job.level().get();
    let mut encoder = Encoder::new(level).map_err(|e| ArchiveError::CompressorInit {
        level,
        reason: e.to_string(),
    })?;

    let destination = job.destination();
    let dir = parent_dir(destination);
    store
        .ensure_dir(dir)
        .map_err(|e| ArchiveError::CreateDir {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

    let sink = store
        .create_temp(destination)
        .map_err(|e| ArchiveError::CreateTemp {
            path: destination.to_path_buf(),
            reason: e.to_string(),
        })?;
    let temp = sink.path().to_path_buf();

    let written = fill_temp(&mut encoder, job.text().as_bytes(), sink).and_then(|compressed| {
        store
            .commit(&temp, destination)
            .map(|()| compressed)
            .map_err(|e| ArchiveError::Rename {
                from: temp.clone(),
                to: destination.to_path_buf(),
                reason: e.to_string(),
            })
    });

    match written {
        Ok(compressed_bytes) => Ok(ArchiveReport {
            destination: destination.to_path_buf(),
            input_bytes: job.text().len() as u64,
            compressed_bytes,
        }),
        Err(e) => {
            store.discard(&temp);
            Err(e)
        }
    }
}

/// Worker entry point: one attempt, outcome logged, never fails.
pub fn run_job(job: ArchivalJob, store: &dyn ArchiveStore) -> Option<ArchiveReport> {
    match write_archive(&job, store) {
        Ok(report) => {
            info!(
                path = %report.destination.display(),
                level = job.level().get(),
                input_bytes = report.input_bytes,
                compressed_bytes = report.compressed_bytes,
                "Scrollback archived"
            );
            Some(report)
        }
        Err(e) => {
            warn!(
                path = %job.destination().display(),
                operation = e.operation(),
                reason = %e.reason(),
                retryable = e.is_retryable(),
                context = %e.context(),
                "Scrollback archive failed: {}",
                e.suggestion()
            );
            None
        }
    }
}

/// Streams the frame into the sink, then flushes and syncs it.
/// The sink is closed when this returns.
fn fill_temp(encoder: &mut Encoder<'_>, text: &[u8], mut sink: Box<dyn ArchiveSink>) -> Result<u64> {
    let path = sink.path().to_path_buf();
    let compressed = stream_frame(encoder, text, sink.as_mut(), &path)?;

    sink.flush().map_err(|e| ArchiveError::Write {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    sink.sync_all().map_err(|e| ArchiveError::Sync {
        path,
        reason: e.to_string(),
    })?;
    Ok(compressed)
}

fn stream_frame(
    encoder: &mut Encoder<'_>,
    text: &[u8],
    sink: &mut dyn ArchiveSink,
    path: &Path,
) -> Result<u64> {
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut input = InBuffer::around(text);
    let mut compressed = 0u64;

    let write_err = |e: std::io::Error| ArchiveError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    while input.pos() < text.len() {
        let produced = {
            let mut output = OutBuffer::around(chunk.as_mut_slice());
            encoder
                .run(&mut input, &mut output)
                .map_err(|e| ArchiveError::Compress(e.to_string()))?;
            output.pos()
        };
        if produced > 0 {
            sink.write_all(&chunk[..produced]).map_err(write_err)?;
            compressed += produced as u64;
        }
    }

    loop {
        let (produced, remaining) = {
            let mut output = OutBuffer::around(chunk.as_mut_slice());
            let remaining = encoder
                .finish(&mut output, true)
                .map_err(|e| ArchiveError::Compress(e.to_string()))?;
            (output.pos(), remaining)
        };
        if produced > 0 {
            sink.write_all(&chunk[..produced]).map_err(write_err)?;
            compressed += produced as u64;
        }
        if remaining == 0 {
            break;
        }
    }

    Ok(compressed)
}
