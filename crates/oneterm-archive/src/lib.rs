#![deny(clippy::all)]

mod archiver;
mod compress;
mod config;
pub mod error;
mod job;
mod naming;
mod pool;
mod store;

pub use archiver::Archiver;
pub use archiver::ArchiverStats;
pub use compress::ArchiveReport;
pub use compress::CHUNK_SIZE;
pub use compress::run_job;
pub use compress::write_archive;
pub use config::ArchiveConfig;
pub use config::app_dir;
pub use config::detected_parallelism;
pub use error::ArchiveError;
pub use job::ArchivalJob;
pub use job::CompressionLevel;
pub use job::is_blank;
pub use naming::ArchiveNamer;
pub use naming::archive_file_name;
pub use pool::WorkerPool;
pub use store::ArchiveSink;
pub use store::ArchiveStore;
pub use store::DiskStore;

pub type Result<T> = std::result::Result<T, ArchiveError>;
