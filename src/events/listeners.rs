//! Listener registry for the push client.
//!
//! Listeners are keyed by [`Channel`]. Fan-out works on a snapshot taken at the
//! start of each pass, so a listener may register or remove listeners (itself
//! included) while it runs; the change applies from the next event on.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::warn;

use super::kind::EventKind;
use super::notification::Notification;
use crate::error::TransportError;
use crate::isolation::{catch_callback, lock};

/// Where a listener is attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// The stream opened.
    Connected,
    /// The client stopped: manual disconnect or retries exhausted.
    Disconnected,
    /// A transport failure. Informational; reconnection is automatic.
    Error,
    /// Every notification, whatever its type.
    Notification,
    /// Notifications of one type.
    Event(EventKind),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Connected => f.write_str("connected"),
            Channel::Disconnected => f.write_str("disconnected"),
            Channel::Error => f.write_str("error"),
            Channel::Notification => f.write_str("notification"),
            Channel::Event(kind) => write!(f, "{kind}"),
        }
    }
}

impl From<EventKind> for Channel {
    fn from(kind: EventKind) -> Self {
        Channel::Event(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Manual,
    MaxAttemptsReached,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Manual => f.write_str("manual disconnect"),
            DisconnectReason::MaxAttemptsReached => {
                f.write_str("max reconnection attempts reached")
            }
        }
    }
}

/// What a listener receives.
#[derive(Debug, Clone)]
pub enum StreamSignal {
    Connected { client_id: String },
    Disconnected { reason: DisconnectReason },
    Error(TransportError),
    Notification(Notification),
}

impl StreamSignal {
    pub fn notification(&self) -> Option<&Notification> {
        match self {
            StreamSignal::Notification(n) => Some(n),
            _ => None,
        }
    }
}

pub type Listener = Arc<dyn Fn(&StreamSignal) + Send + Sync>;

/// Handle returned by registration, used to remove the listener later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    channels: Mutex<HashMap<Channel, Vec<(ListenerId, Listener)>>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = lock(&self.channels);
        f.debug_struct("ListenerRegistry")
            .field("channels", &channels.len())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, channel: Channel, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.channels)
            .entry(channel)
            .or_default()
            .push((id, listener));
        id
    }

    /// Returns false when nothing was registered under that id.
    pub fn remove(&self, channel: &Channel, id: ListenerId) -> bool {
        let mut channels = lock(&self.channels);
        let Some(listeners) = channels.get_mut(channel) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            channels.remove(channel);
        }
        removed
    }

    pub fn count(&self, channel: &Channel) -> usize {
        lock(&self.channels).get(channel).map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        lock(&self.channels).clear();
    }

    /// Invoke every listener on `channel` in registration order.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    /// Returns how many listeners completed normally.
    pub fn emit(&self, channel: &Channel, signal: &StreamSignal) -> usize {
        let snapshot: Vec<(ListenerId, Listener)> = match lock(&self.channels).get(channel) {
            Some(listeners) => listeners.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for (id, listener) in snapshot {
            match catch_callback(|| listener(signal)) {
                Ok(()) => delivered += 1,
                Err(panic) => warn!(%channel, listener = id.0, %panic, "listener panicked"),
            }
        }
        delivered
    }
}
