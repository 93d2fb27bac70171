//! # Background Worker Pool
//!
//! A fixed set of threads draining a bounded job channel. Full visibility
//! scans run here so the tick thread never blocks on a region-wide walk.
//!
//! ```text
//!   tick / events ──try_send──► [bounded channel] ──► worker 0
//!                                                 ├─► worker 1
//!                                                 └─► worker N
//! ```
//!
//! Submission never blocks: a full queue is reported as
//! [`InterestError::PoolSaturated`] and the caller retries later. A job that
//! panics is logged and the worker keeps serving the queue.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::error::{InterestError, InterestResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Bounded-concurrency executor shared by any number of viewers.
pub struct WorkerPool {
    tx: Mutex<Option<Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    thread_ids: Vec<ThreadId>,
    completed: Arc<AtomicU64>,
}

impl WorkerPool {
    /// Spawns `threads` workers over a queue of `queue` pending jobs.
    ///
    /// # Errors
    ///
    /// Returns [`InterestError::Spawn`] if a worker thread cannot be created.
    pub fn new(threads: usize, queue: usize) -> InterestResult<Self> {
        let (tx, rx) = crossbeam_channel::bounded::<Job>(queue.max(1));
        let completed = Arc::new(AtomicU64::new(0));
        let mut handles = Vec::with_capacity(threads.max(1));
        for index in 0..threads.max(1) {
            let rx = rx.clone();
            let completed = Arc::clone(&completed);
            let handle = thread::Builder::new()
                .name(format!("vista-worker-{index}"))
                .spawn(move || work(&rx, &completed))?;
            handles.push(handle);
        }
        let thread_ids = handles.iter().map(|h| h.thread().id()).collect();
        tracing::debug!(threads = handles.len(), queue, "worker pool started");
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            handles: Mutex::new(handles),
            thread_ids,
            completed,
        })
    }

    /// Queues `job` without blocking.
    ///
    /// # Errors
    ///
    /// [`InterestError::PoolSaturated`] when the queue is full,
    /// [`InterestError::PoolShutdown`] after [`WorkerPool::shutdown`].
    pub fn spawn<F>(&self, job: F) -> InterestResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(InterestError::PoolShutdown);
        };
        match tx.try_send(Box::new(job)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(InterestError::PoolSaturated),
            Err(TrySendError::Disconnected(_)) => Err(InterestError::PoolShutdown),
        }
    }

    /// Jobs finished since start.
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// Stops accepting jobs, lets queued jobs finish and joins the workers.
    /// Idempotent. Called from a worker, it does not join.
    pub fn shutdown(&self) {
        drop(self.tx.lock().take());
        if self.thread_ids.contains(&thread::current().id()) {
            return;
        }
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn work(rx: &Receiver<Job>, completed: &AtomicU64) {
    while let Ok(job) = rx.recv() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::warn!(
                worker = thread::current().name().unwrap_or("vista-worker"),
                "job panicked, worker continues"
            );
        }
        completed.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_runs_jobs() {
        let pool = WorkerPool::new(2, 16).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        for i in 0..8 {
            let tx = tx.clone();
            pool.spawn(move || tx.send(i).unwrap()).unwrap();
        }
        let mut seen: Vec<i32> =
            (0..8).map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_saturation() {
        let pool = WorkerPool::new(1, 1).unwrap();
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(0);

        pool.spawn(move || {
            started_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        })
        .unwrap();
        started_rx.recv().unwrap();

        // Worker busy, one slot free.
        pool.spawn(|| {}).unwrap();
        assert!(matches!(pool.spawn(|| {}), Err(InterestError::PoolSaturated)));

        release_tx.send(()).unwrap();
        pool.shutdown();
        assert_eq!(pool.completed(), 2);
    }

    #[test]
    fn test_panicking_job_keeps_worker_alive() {
        let pool = WorkerPool::new(1, 4).unwrap();
        pool.spawn(|| panic!("scan blew up")).unwrap();

        let (tx, rx) = crossbeam_channel::bounded(1);
        pool.spawn(move || tx.send(7).unwrap()).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);

        pool.shutdown();
        assert_eq!(pool.completed(), 2);
    }

    #[test]
    fn test_spawn_after_shutdown() {
        let pool = WorkerPool::new(1, 4).unwrap();
        pool.shutdown();
        pool.shutdown();
        assert!(matches!(pool.spawn(|| {}), Err(InterestError::PoolShutdown)));
    }
}
