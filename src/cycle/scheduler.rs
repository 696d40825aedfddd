//! Cycle scheduler
//!
//! Drives dispatch cycles on a fixed interval without ever letting two
//! cycles overlap: the timer stays disarmed while a cycle runs and is only
//! re-armed once the cycle has run to completion. A slow cycle therefore
//! stretches the effective period instead of piling up; there is no
//! catch-up or tick skipping.
//!
//! The guarantee also holds across a stop/start: `stop` does not interrupt
//! a cycle in flight, so a restarted scheduler waits for the previous loop
//! to drain before running its first cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::cycle::dispatch::DispatchCycle;

/// One spawned scheduler loop.
///
/// Each `start` creates a fresh generation with its own flag and waker, so
/// a restart can never re-arm a loop that was already told to stop.
struct LoopHandle {
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

/// Non-reentrant periodic driver for a [`DispatchCycle`].
pub struct CycleScheduler {
    cycle: Arc<DispatchCycle>,
    interval: Duration,
    current: Mutex<Option<LoopHandle>>,
}

impl CycleScheduler {
    /// Create a scheduler firing the given cycle every `interval`.
    #[must_use]
    pub fn new(cycle: DispatchCycle, interval: Duration) -> Self {
        Self {
            cycle: Arc::new(cycle),
            interval,
            current: Mutex::new(None),
        }
    }

    /// Begin periodic dispatch. A no-op if already running.
    ///
    /// Must be called within a tokio runtime; the loop runs as a spawned
    /// task and survives until [`stop`](Self::stop). Restarting while the
    /// stopped loop is still draining an in-flight cycle is safe: the new
    /// loop waits for the old one to exit before its first cycle.
    pub fn start(&self) {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if current
            .as_ref()
            .is_some_and(|handle| handle.running.load(Ordering::SeqCst))
        {
            return;
        }
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "dispatch scheduler started"
        );

        let previous = current.take().map(|handle| handle.task);
        let running = Arc::new(AtomicBool::new(true));
        let stop = Arc::new(Notify::new());

        let cycle = Arc::clone(&self.cycle);
        let interval = self.interval;
        let task = tokio::spawn({
            let running = Arc::clone(&running);
            let stop = Arc::clone(&stop);
            async move {
                // A stopped predecessor may still be finishing its cycle.
                if let Some(previous) = previous {
                    let _ = previous.await;
                }
                while running.load(Ordering::SeqCst) {
                    // The timer is disarmed for the duration of the cycle.
                    cycle.run_once().await;

                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    tokio::select! {
                        () = tokio::time::sleep(interval) => {}
                        () = stop.notified() => {}
                    }
                }
            }
        });
        *current = Some(LoopHandle {
            running,
            stop,
            task,
        });
    }

    /// Disable further cycles. A cycle already in flight is not
    /// interrupted; it finishes, observes the cleared flag, and the loop
    /// exits.
    pub fn stop(&self) {
        let current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = current.as_ref() {
            if handle.running.swap(false, Ordering::SeqCst) {
                handle.stop.notify_waiters();
                tracing::info!("dispatch scheduler stopped");
            }
        }
    }

    /// Whether periodic dispatch is currently enabled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| handle.running.load(Ordering::SeqCst))
    }
}
