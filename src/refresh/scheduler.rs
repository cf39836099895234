//! Cancellable scheduled tasks.
//!
//! Polling timers and reconnect delays go through [`Scheduler`] rather than
//! spawning timers directly, so their lifetime is owned by a [`TaskHandle`]
//! and tests can swap in a clock they drive by hand.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::{RealtimeError, RealtimeResult};

pub type Tick = Arc<dyn Fn() + Send + Sync>;
pub type OnceTask = Box<dyn FnOnce() + Send>;

pub trait Scheduler: Send + Sync {
    /// Run `tick` every `period`, first after one full period.
    fn every(&self, period: Duration, tick: Tick) -> TaskHandle;

    /// Run `task` once after `delay`.
    fn after(&self, delay: Duration, task: OnceTask) -> TaskHandle;
}

/// Owner of one scheduled task. Dropping the handle cancels the task.
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TaskHandle {
    /// Build a handle around a scheduler-specific cancel hook.
    ///
    /// The returned flag flips to `true` on cancellation; schedulers check it
    /// before each run.
    pub fn new<F>(on_cancel: F) -> (Self, Arc<AtomicBool>)
    where
        F: FnOnce() + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let handle = Self {
            cancelled: cancelled.clone(),
            on_cancel: Some(Box::new(on_cancel)),
        };
        (handle, cancelled)
    }

    pub fn cancel(mut self) {
        self.cancel_in_place();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn cancel_in_place(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(on_cancel) = self.on_cancel.take() {
            on_cancel();
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel_in_place();
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Scheduler backed by tokio timers. Honors tokio's paused test clock.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Bind to the runtime the caller is running on.
    pub fn current() -> RealtimeResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| RealtimeError::Config(format!("no tokio runtime available: {e}")))
    }
}

impl Scheduler for TokioScheduler {
    fn every(&self, period: Duration, tick: Tick) -> TaskHandle {
        let period = period.max(Duration::from_millis(1));
        let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel::<()>();
        let (handle, cancelled) = TaskHandle::new(move || {
            let _ = stop_tx.send(());
        });

        self.runtime.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if cancelled.load(Ordering::SeqCst) {
                            break;
                        }
                        tick();
                    }
                }
            }
        });
        handle
    }

    fn after(&self, delay: Duration, task: OnceTask) -> TaskHandle {
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let (handle, cancelled) = TaskHandle::new(move || {
            let _ = stop_tx.send(());
        });

        self.runtime.spawn(async move {
            tokio::select! {
                _ = stop_rx => {}
                _ = time::sleep(delay) => {
                    if !cancelled.load(Ordering::SeqCst) {
                        task();
                    }
                }
            }
        });
        handle
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counting_tick() -> (Arc<AtomicUsize>, Tick) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        let tick: Tick = Arc::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (hits, tick)
    }

    #[tokio::test(start_paused = true)]
    async fn interval_waits_one_period_before_first_tick() {
        let scheduler = TokioScheduler::current().unwrap();
        let (hits, tick) = counting_tick();
        let _handle = scheduler.every(Duration::from_secs(1), tick);

        time::sleep(Duration::from_millis(999)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_interval() {
        let scheduler = TokioScheduler::current().unwrap();
        let (hits, tick) = counting_tick();
        let handle = scheduler.every(Duration::from_secs(1), tick);

        time::sleep(Duration::from_millis(1_500)).await;
        drop(handle);
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_one_shot_never_runs() {
        let scheduler = TokioScheduler::current().unwrap();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let handle = scheduler.after(
            Duration::from_secs(2),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );
        assert!(!handle.is_cancelled());
        handle.cancel();

        time::sleep(Duration::from_secs(5)).await;
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_runs_after_its_delay() {
        let scheduler = TokioScheduler::current().unwrap();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let _handle = scheduler.after(
            Duration::from_secs(2),
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );

        time::sleep(Duration::from_millis(1_900)).await;
        assert!(!ran.load(Ordering::SeqCst));
        time::sleep(Duration::from_millis(200)).await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn current_without_runtime_is_an_error() {
        assert!(TokioScheduler::current().is_err());
    }
}
