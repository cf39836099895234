//! Polling refresh coordination.
//!
//! Views register a callback per data domain with their own polling interval.
//! Push events can force every view of a domain to refresh at once through
//! [`RefreshCoordinator::trigger_refresh`].
//!
//! Timers are owned [`TaskHandle`]s produced by a [`Scheduler`]:
//! [`TokioScheduler`] in production, [`ManualScheduler`] when a test wants to
//! drive the clock itself.

mod coordinator;
mod manual;
mod scheduler;

pub use coordinator::{RefreshCallback, RefreshCoordinator};
pub use manual::ManualScheduler;
pub use scheduler::{OnceTask, Scheduler, TaskHandle, Tick, TokioScheduler};
