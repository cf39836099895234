//! Shared doubles for the integration tests.

pub mod scripted_transport;

pub use scripted_transport::{Outcome, ScriptedTransport};
