//! Server push client.
//!
//! - `transport`: opening the push channel and SSE framing
//! - `client`: connection lifecycle, fan-out, reconnection
//! - `typed`: per-event listener shortcuts
//! - `api`: stored-notification REST calls

pub mod api;
pub mod client;
pub mod transport;
mod typed;

pub use api::NotificationApi;
pub use client::{ConnectionState, EventStreamClient};
pub use transport::{EventTransport, FrameStream, HttpEventTransport, SseDecoder};
