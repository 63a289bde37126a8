use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use tracing::debug;
use tracing::info;
use tracing::warn;

use oneterm_common::mutex_lock_or_recover;

use crate::compress::run_job;
use crate::config::ArchiveConfig;
use crate::error::ArchiveError;
use crate::job::is_blank;
use crate::job::ArchivalJob;
use crate::job::CompressionLevel;
use crate::naming::ArchiveNamer;
use crate::pool::WorkerPool;
use crate::store::ArchiveStore;
use crate::store::DiskStore;
use crate::Result;

const POOL_NAME: &str = "archive";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiverStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub pools_created: u64,
    pub workers: usize,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    pools_created: AtomicU64,
    workers: AtomicUsize,
}

enum PoolState {
    Idle,
    Running(WorkerPool<ArchivalJob>),
    ShutDown,
}

/// Process-wide entry point for background scrollback archival.
///
/// The worker pool is built on the first submission and lives until
/// [`Archiver::shutdown`], which drains every queued job. Dropping the
/// archiver shuts it down as well.
pub struct Archiver {
    config: ArchiveConfig,
    store: Arc<dyn ArchiveStore>,
    namer: ArchiveNamer,
    state: Mutex<PoolState>,
    counters: Arc<Counters>,
}

impl Archiver {
    pub fn new(config: ArchiveConfig) -> Self {
        Self::with_store(config, Arc::new(DiskStore::new()))
    }

    pub fn with_store(config: ArchiveConfig, store: Arc<dyn ArchiveStore>) -> Self {
        let namer = ArchiveNamer::new(config.log_dir.clone());
        Self {
            config,
            store,
            namer,
            state: Mutex::new(PoolState::Idle),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn log_dir(&self) -> &Path {
        self.namer.dir()
    }

    /// Archives `text` in the background.
    ///
    /// Returns the destination the archive will be written to, or `None`
    /// when the text is blank and nothing was queued.
    pub fn submit_text(&self, text: String, level: CompressionLevel) -> Result<Option<PathBuf>> {
        if is_blank(&text) {
            debug!("Scrollback is blank; nothing to archive");
            return Ok(None);
        }
        let destination = self.namer.next_path();
        self.submit(ArchivalJob::new(text, destination.clone(), level))?;
        Ok(Some(destination))
    }

    /// Queues a job and returns immediately. The first call starts the pool.
    pub fn submit(&self, job: ArchivalJob) -> Result<()> {
        let mut state = mutex_lock_or_recover(&self.state);

        if matches!(*state, PoolState::Idle) {
            *state = PoolState::Running(self.start_pool()?);
        }

        let pool = match &*state {
            PoolState::Running(pool) => pool,
            _ => {
                warn!(
                    path = %job.destination().display(),
                    "Archive submitted after shutdown; dropping job"
                );
                return Err(ArchiveError::ShutDown);
            }
        };

        let destination = job.destination().to_path_buf();
        if pool.execute(job).is_err() {
            warn!(path = %destination.display(), "Archive queue closed; dropping job");
            return Err(ArchiveError::ShutDown);
        }

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(
            path = %destination.display(),
            queued = pool.queued(),
            "Archive job queued"
        );
        Ok(())
    }

    /// Stops accepting jobs and blocks until every queued and in-flight
    /// job has finished. Concurrent callers wait for the same drain; later
    /// calls return immediately.
    pub fn shutdown(&self) -> ArchiverStats {
        // Held across the drain.
        let mut state = mutex_lock_or_recover(&self.state);

        match std::mem::replace(&mut *state, PoolState::ShutDown) {
            PoolState::Running(mut pool) => {
                let pending = pool.queued();
                debug!(pending, "Draining archive queue");
                pool.shutdown();
                let stats = self.stats();
                info!(
                    submitted = stats.submitted,
                    completed = stats.completed,
                    failed = stats.failed,
                    "Archival subsystem shut down"
                );
                stats
            }
            PoolState::Idle => {
                debug!("Archival subsystem shut down before first use");
                self.stats()
            }
            PoolState::ShutDown => self.stats(),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        matches!(*mutex_lock_or_recover(&self.state), PoolState::ShutDown)
    }

    pub fn stats(&self) -> ArchiverStats {
        ArchiverStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            pools_created: self.counters.pools_created.load(Ordering::Relaxed),
            workers: self.counters.workers.load(Ordering::Relaxed),
        }
    }

    fn start_pool(&self) -> Result<WorkerPool<ArchivalJob>> {
        let store = Arc::clone(&self.store);
        let counters = Arc::clone(&self.counters);
        let size = self.config.worker_count();

        let pool = WorkerPool::new(POOL_NAME, size, move |job: ArchivalJob| {
            match run_job(job, store.as_ref()) {
                Some(_) => counters.completed.fetch_add(1, Ordering::Relaxed),
                None => counters.failed.fetch_add(1, Ordering::Relaxed),
            };
        })?;

        self.counters.pools_created.fetch_add(1, Ordering::Relaxed);
        self.counters.workers.store(pool.size(), Ordering::Relaxed);
        info!(
            workers = pool.size(),
            log_dir = %self.config.log_dir.display(),
            "Archive worker pool started"
        );
        Ok(pool)
    }
}

impl Drop for Archiver {
    fn drop(&mut self) {
        self.shutdown();
    }
}
