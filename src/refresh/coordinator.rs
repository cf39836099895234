use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use super::scheduler::{Scheduler, TaskHandle, Tick};
use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::error::{RealtimeError, RealtimeResult};
use crate::events::RefreshDomain;
use crate::isolation::{catch_callback, lock};

pub type RefreshCallback = Arc<dyn Fn() + Send + Sync>;

struct Subscription {
    domain: RefreshDomain,
    callback: RefreshCallback,
    interval: Duration,
    /// Dropping this cancels the polling timer.
    _timer: TaskHandle,
}

#[derive(Default)]
struct Registry {
    subscriptions: HashMap<String, Subscription>,
    /// Subscriber ids per domain, in registration order.
    by_domain: HashMap<RefreshDomain, Vec<String>>,
}

impl Registry {
    fn detach(&mut self, subscriber_id: &str) -> Option<Subscription> {
        let previous = self.subscriptions.remove(subscriber_id)?;
        if let Some(ids) = self.by_domain.get_mut(&previous.domain) {
            ids.retain(|id| id != subscriber_id);
            if ids.is_empty() {
                self.by_domain.remove(&previous.domain);
            }
        }
        Some(previous)
    }
}

/// Polling scheduler shared by every view that watches a data domain.
///
/// Each subscriber owns exactly one timer. [`RefreshCoordinator::trigger_refresh`]
/// runs every callback of a domain immediately, ahead of their timers.
pub struct RefreshCoordinator {
    scheduler: Arc<dyn Scheduler>,
    default_interval: Duration,
    registry: Mutex<Registry>,
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = lock(&self.registry);
        f.debug_struct("RefreshCoordinator")
            .field("default_interval", &self.default_interval)
            .field("subscribers", &registry.subscriptions.len())
            .finish()
    }
}

impl RefreshCoordinator {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self::with_default_interval(scheduler, Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }

    pub fn with_default_interval(scheduler: Arc<dyn Scheduler>, default_interval: Duration) -> Self {
        Self {
            scheduler,
            default_interval,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Register `callback` under `domain`, polled every `interval`.
    ///
    /// An existing subscription with the same id is replaced and its timer
    /// cancelled.
    pub fn subscribe<F>(
        &self,
        subscriber_id: impl Into<String>,
        domain: RefreshDomain,
        callback: F,
        interval: Duration,
    ) -> RealtimeResult<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let subscriber_id = subscriber_id.into();
        if subscriber_id.trim().is_empty() {
            return Err(RealtimeError::InvalidArgument(
                "subscriber id must not be empty".into(),
            ));
        }
        if interval.is_zero() {
            return Err(RealtimeError::InvalidArgument(format!(
                "polling interval for {subscriber_id} must be greater than zero"
            )));
        }

        let callback: RefreshCallback = Arc::new(callback);
        let tick: Tick = {
            let callback = callback.clone();
            let subscriber_id = subscriber_id.clone();
            Arc::new(move || {
                run_callback(&subscriber_id, domain, &callback);
            })
        };

        let replaced = {
            let mut registry = lock(&self.registry);
            let replaced = registry.detach(&subscriber_id);
            let timer = self.scheduler.every(interval, tick);
            registry
                .by_domain
                .entry(domain)
                .or_default()
                .push(subscriber_id.clone());
            registry.subscriptions.insert(
                subscriber_id.clone(),
                Subscription {
                    domain,
                    callback,
                    interval,
                    _timer: timer,
                },
            );
            replaced
        };

        if let Some(previous) = replaced {
            debug!(
                subscriber = %subscriber_id,
                previous_domain = %previous.domain,
                previous_interval_ms = previous.interval.as_millis() as u64,
                "replaced existing subscription"
            );
        }
        debug!(
            subscriber = %subscriber_id,
            %domain,
            interval_ms = interval.as_millis() as u64,
            "subscribed to refresh domain"
        );
        Ok(())
    }

    /// [`subscribe`](Self::subscribe) with the configured default interval.
    pub fn subscribe_default<F>(
        &self,
        subscriber_id: impl Into<String>,
        domain: RefreshDomain,
        callback: F,
    ) -> RealtimeResult<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(subscriber_id, domain, callback, self.default_interval)
    }

    /// Cancel the subscriber's timer and forget it. Returns false if unknown.
    pub fn unsubscribe(&self, subscriber_id: &str) -> bool {
        let removed = lock(&self.registry).detach(subscriber_id);
        match removed {
            Some(subscription) => {
                debug!(subscriber = %subscriber_id, domain = %subscription.domain, "unsubscribed");
                true
            }
            None => false,
        }
    }

    /// Run every callback registered for `domain` now, in registration order.
    ///
    /// Returns the number of callbacks that completed without panicking.
    pub fn trigger_refresh(&self, domain: RefreshDomain) -> usize {
        let snapshot: Vec<(String, RefreshCallback)> = {
            let registry = lock(&self.registry);
            registry
                .by_domain
                .get(&domain)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| {
                            registry
                                .subscriptions
                                .get(id)
                                .map(|s| (id.clone(), s.callback.clone()))
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        debug!(%domain, subscribers = snapshot.len(), "triggering refresh");
        snapshot
            .iter()
            .filter(|(id, callback)| run_callback(id, domain, callback))
            .count()
    }

    pub fn subscriber_count(&self, domain: RefreshDomain) -> usize {
        lock(&self.registry).by_domain.get(&domain).map_or(0, Vec::len)
    }

    pub fn subscriber_ids(&self, domain: RefreshDomain) -> Vec<String> {
        lock(&self.registry)
            .by_domain
            .get(&domain)
            .cloned()
            .unwrap_or_default()
    }

    pub fn interval_of(&self, subscriber_id: &str) -> Option<Duration> {
        lock(&self.registry)
            .subscriptions
            .get(subscriber_id)
            .map(|s| s.interval)
    }

    /// Cancel every timer and drop every registration.
    pub fn clear_all(&self) {
        let drained = std::mem::take(&mut *lock(&self.registry));
        debug!(subscribers = drained.subscriptions.len(), "cleared all subscriptions");
        drop(drained);
    }
}

fn run_callback(subscriber_id: &str, domain: RefreshDomain, callback: &RefreshCallback) -> bool {
    match catch_callback(|| callback()) {
        Ok(()) => true,
        Err(panic) => {
            warn!(subscriber = %subscriber_id, %domain, %panic, "refresh callback panicked");
            false
        }
    }
}
