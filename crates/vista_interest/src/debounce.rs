//! # Debounce Timer
//!
//! Collapses a burst of triggers into one callback, fired once the burst has
//! been quiet for the configured window. Re-arming inside the window
//! restarts it.
//!
//! ```text
//! arm  arm   arm                      arm
//!  │    │     │                        │
//!  ▼    ▼     ▼                        ▼
//!  ├────┼─────┼─────── delay ──► fire  ├─────── delay ──► fire
//! ```
//!
//! The timer runs on its own thread; the callback runs there too.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::InterestResult;

enum Signal {
    Arm,
    Stop,
}

/// Cloneable handle that (re)arms a [`Debouncer`].
#[derive(Clone)]
pub struct DebounceTrigger {
    tx: Sender<Signal>,
}

impl DebounceTrigger {
    /// Starts or restarts the quiet window. A no-op once the timer stopped.
    pub fn arm(&self) {
        // Receiver gone means the timer stopped.
        let _ = self.tx.send(Signal::Arm);
    }
}

/// Owner of the timer thread.
pub struct Debouncer {
    trigger: DebounceTrigger,
    fired: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
    thread_id: Option<ThreadId>,
}

impl Debouncer {
    /// Spawns the timer thread.
    ///
    /// # Errors
    ///
    /// Returns [`InterestError::Spawn`](crate::InterestError::Spawn) if the
    /// thread cannot be created.
    pub fn new<F>(delay: Duration, callback: F) -> InterestResult<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded();
        let fired = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&fired);
        let handle = thread::Builder::new()
            .name("vista-debounce".into())
            .spawn(move || run(&rx, delay, &counter, &callback))?;
        let thread_id = Some(handle.thread().id());
        Ok(Self { trigger: DebounceTrigger { tx }, fired, handle: Some(handle), thread_id })
    }

    /// Starts or restarts the quiet window.
    pub fn arm(&self) {
        self.trigger.arm();
    }

    /// A handle other components can arm without owning the timer.
    #[must_use]
    pub fn trigger(&self) -> DebounceTrigger {
        self.trigger.clone()
    }

    /// Times the callback has fired.
    #[must_use]
    pub fn fire_count(&self) -> u64 {
        self.fired.load(Ordering::Acquire)
    }

    /// Cancels any pending window and joins the thread. Idempotent.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.trigger.tx.send(Signal::Stop);
        if self.thread_id == Some(thread::current().id()) {
            return;
        }
        if handle.join().is_err() {
            tracing::warn!("debounce thread panicked");
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<F: Fn()>(rx: &Receiver<Signal>, delay: Duration, fired: &AtomicU64, callback: &F) {
    loop {
        match rx.recv() {
            Ok(Signal::Arm) => {}
            Ok(Signal::Stop) | Err(_) => return,
        }
        loop {
            match rx.recv_timeout(delay) {
                Ok(Signal::Arm) => {}
                Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {
                    fired.fetch_add(1, Ordering::AcqRel);
                    callback();
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn counting(delay_ms: u64) -> (Debouncer, Arc<AtomicU64>) {
        let calls = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&calls);
        let debouncer = Debouncer::new(Duration::from_millis(delay_ms), move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        (debouncer, calls)
    }

    fn wait_for(calls: &AtomicU64, expected: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while calls.load(Ordering::SeqCst) < expected && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_burst_fires_once() {
        let (debouncer, calls) = counting(100);
        for _ in 0..20 {
            debouncer.arm();
        }
        wait_for(&calls, 1);
        thread::sleep(Duration::from_millis(250));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(debouncer.fire_count(), 1);
    }

    #[test]
    fn test_separate_bursts_fire_separately() {
        let (debouncer, calls) = counting(30);
        debouncer.arm();
        wait_for(&calls, 1);
        debouncer.trigger().arm();
        wait_for(&calls, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stop_cancels_pending() {
        let (mut debouncer, calls) = counting(200);
        debouncer.arm();
        debouncer.stop();
        debouncer.stop();
        thread::sleep(Duration::from_millis(300));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        debouncer.arm();
    }
}
