//! Realtime update pipeline for the staff management dashboard.
//!
//! Two services cooperate:
//! - [`EventStreamClient`] keeps one server-push connection per signed-in
//!   user, parses notifications, keeps a bounded history, reconnects with
//!   linear backoff and fans events out to listeners.
//! - [`RefreshCoordinator`] lets views poll a data domain on their own
//!   schedule and refreshes every view of a domain at once when a push event
//!   touches it.
//!
//! # Architecture
//!
//! - `events`: event kinds, notifications, history, listeners, classification
//! - `refresh`: scheduler abstraction and the polling coordinator
//! - `stream`: push transport, client, stored-notification API
//! - `config` / `error`: shared configuration and error types
//!
//! [`Realtime`] wires one of each together with an explicit `init`/`dispose`
//! lifecycle. There is no global instance.

pub mod config;
pub mod error;
pub mod events;
pub mod refresh;
pub mod stream;

mod isolation;

use std::sync::Arc;

pub use config::RealtimeConfig;
pub use error::{RealtimeError, RealtimeResult, TransportError};
pub use events::{
    Channel, DisconnectReason, EventKind, ListenerId, Notification, RefreshDomain, StreamSignal,
};
pub use refresh::{ManualScheduler, RefreshCoordinator, Scheduler, TaskHandle, TokioScheduler};
pub use stream::{
    ConnectionState, EventStreamClient, EventTransport, HttpEventTransport, NotificationApi,
};

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Defaults to debug output for this crate and info elsewhere. Does nothing if
/// a global subscriber is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("realtime_sync=debug,info")),
        )
        .try_init();
}

/// The push client and refresh coordinator of one app session.
#[derive(Debug)]
pub struct Realtime {
    refresh: Arc<RefreshCoordinator>,
    client: EventStreamClient,
    api: NotificationApi,
}

impl Realtime {
    /// Build the HTTP-backed services on the current tokio runtime.
    pub fn init(config: RealtimeConfig) -> RealtimeResult<Self> {
        let scheduler = Arc::new(TokioScheduler::current()?);
        let transport = Arc::new(HttpEventTransport::new()?);
        Self::with_parts(config, transport, scheduler)
    }

    /// Build the services over a caller-supplied transport and scheduler.
    pub fn with_parts(
        config: RealtimeConfig,
        transport: Arc<dyn EventTransport>,
        scheduler: Arc<dyn Scheduler>,
    ) -> RealtimeResult<Self> {
        config.validate()?;
        let refresh = Arc::new(RefreshCoordinator::with_default_interval(
            scheduler.clone(),
            config.default_poll_interval(),
        ));
        let api = NotificationApi::new(&config)?;
        let client = EventStreamClient::new(config, transport, scheduler, Some(refresh.clone()));
        tracing::debug!(base_url = %client.config().api_base_url, "realtime services initialised");
        Ok(Self {
            refresh,
            client,
            api,
        })
    }

    pub fn client(&self) -> &EventStreamClient {
        &self.client
    }

    pub fn refresh(&self) -> &Arc<RefreshCoordinator> {
        &self.refresh
    }

    pub fn api(&self) -> &NotificationApi {
        &self.api
    }

    pub async fn connect(&self, user_id: &str) {
        self.client.connect(user_id).await;
    }

    pub async fn fetch_stored_notifications(&self) -> RealtimeResult<Vec<Notification>> {
        self.api.fetch_stored_notifications().await
    }

    /// Clear the local history, then the server-side backlog.
    pub async fn clear_session_history(&self) -> RealtimeResult<()> {
        self.client.clear_notification_history();
        self.api.clear_stored_notifications().await
    }

    /// Disconnect and cancel every polling timer.
    pub fn dispose(&self) {
        self.client.disconnect();
        self.refresh.clear_all();
        tracing::debug!("realtime services disposed");
    }
}
