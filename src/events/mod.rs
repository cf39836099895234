//! Push event model.
//!
//! - `kind`: closed set of event types sent by the server
//! - `notification`: a received event with its payload and arrival time
//! - `history`: bounded newest-first log of received events
//! - `listeners`: channel-keyed listener registry with isolated fan-out
//! - `classify`: which refresh domains each event type touches

pub mod classify;
pub mod history;
pub mod kind;
pub mod listeners;
pub mod notification;

pub use classify::{domains_for, RefreshDomain};
pub use history::HistoryBuffer;
pub use kind::EventKind;
pub use listeners::{
    Channel, DisconnectReason, Listener, ListenerId, ListenerRegistry, StreamSignal,
};
pub use notification::{FrameError, Notification};
