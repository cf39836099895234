//! Push notification client.
//!
//! One client owns at most one live stream. Each inbound frame is parsed,
//! recorded in the history buffer, fanned out to listeners, and mapped to the
//! refresh domains it affects.
//!
//! # Reconnection
//!
//! ```text
//! connected --(transport error)--> disconnected --(after base * n)--> connecting
//!     ^                                  |                                 |
//!     +----------------(open)------------|---------------------------------+
//!                                        +--(n == max)--> disconnected (terminal)
//! ```
//!
//! The delay is linear in the attempt number. A successful open resets the
//! counter. A manual [`EventStreamClient::disconnect`] cancels any pending
//! retry and suppresses further ones until the next `connect`.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use super::transport::{EventTransport, FrameStream, HttpEventTransport};
use crate::config::RealtimeConfig;
use crate::error::{RealtimeResult, TransportError};
use crate::events::{
    domains_for, Channel, DisconnectReason, EventKind, HistoryBuffer, ListenerId,
    ListenerRegistry, Notification, StreamSignal,
};
use crate::isolation::lock;
use crate::refresh::{RefreshCoordinator, Scheduler, TaskHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

#[derive(Default)]
struct Session {
    state: ConnectionState,
    client_id: Option<String>,
    attempts: u32,
    /// Bumped by every open and every manual disconnect; work started under
    /// an older generation is discarded.
    generation: u64,
    manual: bool,
    reader: Option<JoinHandle<()>>,
    retry: Option<TaskHandle>,
}

impl Session {
    fn close_transport(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.retry = None;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close_transport();
    }
}

struct ClientInner {
    config: RealtimeConfig,
    transport: Arc<dyn EventTransport>,
    scheduler: Arc<dyn Scheduler>,
    refresh: Option<Arc<RefreshCoordinator>>,
    listeners: ListenerRegistry,
    history: Mutex<HistoryBuffer>,
    session: Mutex<Session>,
}

/// Handle to the push client. Clones share the same connection.
#[derive(Clone)]
pub struct EventStreamClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for EventStreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = lock(&self.inner.session);
        f.debug_struct("EventStreamClient")
            .field("state", &session.state)
            .field("client_id", &session.client_id)
            .field("attempts", &session.attempts)
            .finish()
    }
}

impl EventStreamClient {
    /// Build a client. Events are classified into `refresh` when one is given.
    pub fn new(
        config: RealtimeConfig,
        transport: Arc<dyn EventTransport>,
        scheduler: Arc<dyn Scheduler>,
        refresh: Option<Arc<RefreshCoordinator>>,
    ) -> Self {
        let history = HistoryBuffer::new(config.history_capacity);
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                scheduler,
                refresh,
                listeners: ListenerRegistry::new(),
                history: Mutex::new(history),
                session: Mutex::new(Session::default()),
            }),
        }
    }

    /// Client over the HTTP push channel at `config.api_base_url`.
    pub fn http(
        config: RealtimeConfig,
        scheduler: Arc<dyn Scheduler>,
        refresh: Option<Arc<RefreshCoordinator>>,
    ) -> RealtimeResult<Self> {
        let transport = HttpEventTransport::new()?;
        Ok(Self::new(config, Arc::new(transport), scheduler, refresh))
    }

    /// Open the stream for `client_id`, replacing any existing connection.
    ///
    /// Returns once the stream has opened or the first attempt has failed;
    /// failures are reported on [`Channel::Error`] and retried in the
    /// background, never returned. An empty `client_id` is ignored.
    pub async fn connect(&self, client_id: &str) {
        let client_id = client_id.trim();
        if client_id.is_empty() {
            warn!("connect called without a client id; staying disconnected");
            return;
        }
        lock(&self.inner.session).attempts = 0;
        self.inner.open(client_id.to_string()).await;
    }

    /// Close the stream and cancel any pending reconnect.
    ///
    /// Emits `disconnected` with [`DisconnectReason::Manual`] unless the client
    /// was already idle.
    pub fn disconnect(&self) {
        let was_active = {
            let mut session = lock(&self.inner.session);
            let active = session.state != ConnectionState::Disconnected || session.retry.is_some();
            session.manual = true;
            session.generation += 1;
            session.close_transport();
            session.state = ConnectionState::Disconnected;
            session.attempts = 0;
            active
        };
        if was_active {
            info!("notification stream disconnected manually");
            self.emit(
                &Channel::Disconnected,
                &StreamSignal::Disconnected {
                    reason: DisconnectReason::Manual,
                },
            );
        }
    }

    pub fn on<F>(&self, channel: impl Into<Channel>, listener: F) -> ListenerId
    where
        F: Fn(&StreamSignal) + Send + Sync + 'static,
    {
        self.inner.listeners.add(channel.into(), Arc::new(listener))
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn off(&self, channel: impl Into<Channel>, id: ListenerId) -> bool {
        self.inner.listeners.remove(&channel.into(), id)
    }

    pub fn listener_count(&self, channel: impl Into<Channel>) -> usize {
        self.inner.listeners.count(&channel.into())
    }

    /// Deliver `signal` to every listener on `channel`, isolating panics.
    pub fn emit(&self, channel: &Channel, signal: &StreamSignal) -> usize {
        self.inner.listeners.emit(channel, signal)
    }

    /// Received notifications, newest first.
    pub fn notification_history(&self) -> Vec<Notification> {
        lock(&self.inner.history).snapshot()
    }

    /// Forget locally buffered notifications. Server-side state is untouched.
    pub fn clear_notification_history(&self) {
        lock(&self.inner.history).clear();
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.inner.session).state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn reconnect_attempts(&self) -> u32 {
        lock(&self.inner.session).attempts
    }

    pub fn client_id(&self) -> Option<String> {
        lock(&self.inner.session).client_id.clone()
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.inner.config
    }

    /// Process one frame body as if it had arrived on the stream.
    pub fn ingest_frame(&self, body: &str) {
        self.inner.handle_frame(body);
    }
}

impl ClientInner {
    async fn open(self: &Arc<Self>, client_id: String) {
        let generation = {
            let mut session = lock(&self.session);
            session.close_transport();
            session.generation += 1;
            session.manual = false;
            session.state = ConnectionState::Connecting;
            session.client_id = Some(client_id.clone());
            session.generation
        };

        let url = self.config.stream_url(&client_id);
        debug!(%client_id, %url, "opening notification stream");

        let opened = match self.config.connect_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.transport.open(&url))
                .await
                .unwrap_or_else(|_| Err(TransportError::Timeout(limit))),
            None => self.transport.open(&url).await,
        };

        match opened {
            Ok(frames) => self.on_open(generation, client_id, frames),
            Err(err) => self.on_failure(generation, err),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        let session = lock(&self.session);
        session.generation == generation && !session.manual
    }

    fn on_open(self: &Arc<Self>, generation: u64, client_id: String, frames: FrameStream) {
        {
            let mut session = lock(&self.session);
            if session.generation != generation || session.manual {
                debug!(%client_id, "discarding stream opened after disconnect");
                return;
            }
            session.attempts = 0;
            session.state = ConnectionState::Connected;
        }

        info!(%client_id, "notification stream connected");
        self.listeners.emit(
            &Channel::Connected,
            &StreamSignal::Connected {
                client_id: client_id.clone(),
            },
        );

        let mut session = lock(&self.session);
        if session.generation != generation || session.manual {
            return;
        }
        let weak = Arc::downgrade(self);
        session.reader = Some(tokio::spawn(pump(weak, generation, frames)));
    }

    fn handle_frame(&self, body: &str) {
        trace!(frame = %body, "notification frame");
        let notification = match Notification::from_frame(body) {
            Ok(notification) => notification,
            Err(err) => {
                warn!(error = %err, "dropping malformed notification frame");
                return;
            }
        };

        let kind = notification.kind.clone();
        debug!(%kind, "notification received");
        lock(&self.history).push(notification.clone());

        let signal = StreamSignal::Notification(notification);
        self.listeners.emit(&Channel::Notification, &signal);
        self.listeners.emit(&Channel::Event(kind.clone()), &signal);
        self.refresh_affected(&kind);
    }

    fn refresh_affected(&self, kind: &EventKind) {
        let Some(refresh) = &self.refresh else {
            return;
        };
        for domain in domains_for(kind) {
            refresh.trigger_refresh(*domain);
        }
    }

    fn on_failure(self: &Arc<Self>, generation: u64, err: TransportError) {
        let retry = {
            let mut session = lock(&self.session);
            if session.generation != generation || session.manual {
                return;
            }
            session.state = ConnectionState::Disconnected;
            // Detach without aborting: this may be running on the reader task.
            session.reader = None;
            if session.attempts < self.config.max_reconnect_attempts {
                session.attempts += 1;
                Some(session.attempts)
            } else {
                None
            }
        };

        warn!(
            error = %err,
            rejected = err.is_server_rejection(),
            "notification stream failed"
        );
        self.listeners.emit(&Channel::Error, &StreamSignal::Error(err));

        match retry {
            Some(attempt) => self.schedule_retry(generation, attempt),
            None => {
                error!(
                    attempts = self.config.max_reconnect_attempts,
                    "giving up on notification stream"
                );
                self.listeners.emit(
                    &Channel::Disconnected,
                    &StreamSignal::Disconnected {
                        reason: DisconnectReason::MaxAttemptsReached,
                    },
                );
            }
        }
    }

    fn schedule_retry(self: &Arc<Self>, generation: u64, attempt: u32) {
        let delay = self.config.reconnect_base_delay() * attempt;
        let weak = Arc::downgrade(self);
        let task = self.scheduler.after(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    tokio::spawn(async move { inner.reconnect(generation).await });
                }
            }),
        );

        let mut session = lock(&self.session);
        if session.generation != generation || session.manual {
            // Dropping `task` cancels it.
            return;
        }
        info!(
            attempt,
            max = self.config.max_reconnect_attempts,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );
        session.retry = Some(task);
    }

    async fn reconnect(self: Arc<Self>, generation: u64) {
        let client_id = {
            let mut session = lock(&self.session);
            if session.generation != generation || session.manual {
                return;
            }
            session.retry = None;
            session.client_id.clone()
        };
        let Some(client_id) = client_id else {
            return;
        };
        self.open(client_id).await;
    }
}

async fn pump(inner: Weak<ClientInner>, generation: u64, mut frames: FrameStream) {
    let failure = loop {
        let next = frames.next().await;
        let Some(client) = inner.upgrade() else {
            return;
        };
        if !client.is_current(generation) {
            return;
        }
        match next {
            Some(Ok(body)) => client.handle_frame(&body),
            Some(Err(err)) => break err,
            None => break TransportError::Closed,
        }
    };

    if let Some(client) = inner.upgrade() {
        client.on_failure(generation, failure);
    }
}
