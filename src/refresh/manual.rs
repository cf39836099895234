use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use super::scheduler::{OnceTask, Scheduler, TaskHandle, Tick};
use crate::isolation::lock;

enum Job {
    Every { period: Duration, tick: Tick },
    Once { delay: Duration, task: Option<OnceTask> },
}

struct Entry {
    id: u64,
    due: Duration,
    job: Job,
}

#[derive(Default)]
struct ClockState {
    now: Duration,
    next_id: u64,
    entries: Vec<Entry>,
}

/// Scheduler on a virtual clock that only moves when [`advance`](Self::advance)
/// is called. Tasks run on the caller's thread.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ClockState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        lock(&self.state).now
    }

    /// Move the clock forward, running every task that falls due on the way in
    /// due-time order. Returns how many task runs happened.
    pub fn advance(&self, by: Duration) -> usize {
        let target = lock(&self.state).now + by;
        let mut runs = 0;
        loop {
            let next = {
                let mut state = lock(&self.state);
                let due = state
                    .entries
                    .iter()
                    .filter(|e| e.due <= target)
                    .min_by_key(|e| (e.due, e.id))
                    .map(|e| e.id);
                match due {
                    None => {
                        state.now = target;
                        break;
                    }
                    Some(id) => take_due(&mut state, id),
                }
            };
            match next {
                Ready::Tick(tick) => tick(),
                Ready::Once(task) => task(),
                Ready::Nothing => continue,
            }
            runs += 1;
        }
        runs
    }

    /// Periods of live repeating tasks, in scheduling order.
    pub fn active_intervals(&self) -> Vec<Duration> {
        lock(&self.state)
            .entries
            .iter()
            .filter_map(|e| match e.job {
                Job::Every { period, .. } => Some(period),
                Job::Once { .. } => None,
            })
            .collect()
    }

    /// Requested delays of one-shot tasks that have not run yet.
    pub fn pending_delays(&self) -> Vec<Duration> {
        lock(&self.state)
            .entries
            .iter()
            .filter_map(|e| match e.job {
                Job::Once { delay, .. } => Some(delay),
                Job::Every { .. } => None,
            })
            .collect()
    }

    fn insert(&self, delay: Duration, job: Job) -> TaskHandle {
        let id = {
            let mut state = lock(&self.state);
            let id = state.next_id;
            state.next_id += 1;
            let due = state.now + delay;
            state.entries.push(Entry { id, due, job });
            id
        };
        let weak: Weak<Mutex<ClockState>> = Arc::downgrade(&self.state);
        let (handle, _) = TaskHandle::new(move || {
            if let Some(state) = weak.upgrade() {
                lock(&state).entries.retain(|e| e.id != id);
            }
        });
        handle
    }
}

enum Ready {
    Tick(Tick),
    Once(OnceTask),
    Nothing,
}

fn take_due(state: &mut ClockState, id: u64) -> Ready {
    let Some(pos) = state.entries.iter().position(|e| e.id == id) else {
        return Ready::Nothing;
    };
    state.now = state.entries[pos].due;
    match &mut state.entries[pos].job {
        Job::Every { period, tick } => {
            let tick = tick.clone();
            let period = *period;
            state.entries[pos].due += period;
            Ready::Tick(tick)
        }
        Job::Once { task, .. } => {
            let task = task.take();
            state.entries.remove(pos);
            task.map_or(Ready::Nothing, Ready::Once)
        }
    }
}

impl Scheduler for ManualScheduler {
    fn every(&self, period: Duration, tick: Tick) -> TaskHandle {
        let period = period.max(Duration::from_millis(1));
        self.insert(period, Job::Every { period, tick })
    }

    fn after(&self, delay: Duration, task: OnceTask) -> TaskHandle {
        self.insert(
            delay,
            Job::Once {
                delay,
                task: Some(task),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn ticks_follow_the_virtual_clock() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        let _handle = scheduler.every(
            Duration::from_secs(1),
            Arc::new(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(scheduler.advance(Duration::from_millis(999)), 0);
        assert_eq!(scheduler.advance(Duration::from_millis(2_001)), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.now(), Duration::from_secs(3));
    }

    #[test]
    fn dropped_handles_are_forgotten() {
        let scheduler = ManualScheduler::new();
        let handle = scheduler.after(Duration::from_secs(1), Box::new(|| {}));
        assert_eq!(scheduler.pending_delays(), vec![Duration::from_secs(1)]);
        drop(handle);
        assert!(scheduler.pending_delays().is_empty());
        assert_eq!(scheduler.advance(Duration::from_secs(5)), 0);
    }

    #[test]
    fn one_shot_runs_once() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        let _handle = scheduler.after(
            Duration::from_secs(2),
            Box::new(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        scheduler.advance(Duration::from_secs(10));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(scheduler.pending_delays().is_empty());
    }
}
