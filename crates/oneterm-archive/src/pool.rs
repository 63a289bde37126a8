use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::error::ArchiveError;
use crate::Result;

/// Fixed-size set of named threads draining one unbounded FIFO queue.
///
/// Jobs are dequeued in submission order; with more than one worker they
/// may complete in any order. A panicking handler is logged and the worker
/// keeps running.
pub struct WorkerPool<J: Send + 'static> {
    name: String,
    sender: Option<Sender<J>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl<J: Send + 'static> WorkerPool<J> {
    pub fn new<F>(name: &str, size: usize, handler: F) -> Result<Self>
    where
        F: Fn(J) + Send + Sync + 'static,
    {
        let size = size.max(1);
        let (sender, receiver) = crossbeam_channel::unbounded::<J>();
        let handler = Arc::new(handler);

        let mut workers = Vec::with_capacity(size);
        let mut last_error = None;

        for id in 0..size {
            let receiver = receiver.clone();
            let handler = Arc::clone(&handler);
            let thread_name = format!("{}-{}", name, id);

            match thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || worker_loop(&thread_name, receiver, handler.as_ref()))
            {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    warn!(pool = name, worker = id, error = %e, "Failed to spawn worker");
                    last_error = Some(e);
                }
            }
        }

        if workers.is_empty() {
            let reason = last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no workers spawned".to_string());
            return Err(ArchiveError::PoolStart(reason));
        }

        if workers.len() < size {
            warn!(
                pool = name,
                spawned = workers.len(),
                requested = size,
                "Worker pool running below requested size"
            );
        }

        debug!(pool = name, workers = workers.len(), "Worker pool started");

        Ok(Self {
            name: name.to_string(),
            sender: Some(sender),
            workers,
        })
    }

    /// Enqueues a job without waiting. Hands the job back if the pool is
    /// shutting down.
    pub fn execute(&self, job: J) -> std::result::Result<(), J> {
        match &self.sender {
            Some(sender) => sender.send(job).map_err(|e| e.into_inner()),
            None => Err(job),
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, |s| s.len())
    }

    /// Closes the queue, lets the workers drain it, and joins them.
    pub fn shutdown(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!(pool = %self.name, "Worker thread panicked outside a job");
            }
        }
        debug!(pool = %self.name, "Worker pool stopped");
    }
}

impl<J: Send + 'static> Drop for WorkerPool<J> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<J, F>(name: &str, receiver: Receiver<J>, handler: &F)
where
    F: Fn(J),
{
    // Ends once every sender is gone and the queue is empty.
    for job in receiver.iter() {
        if catch_unwind(AssertUnwindSafe(|| handler(job))).is_err() {
            error!(worker = name, "Job panicked; continuing with next job");
        }
    }
}
