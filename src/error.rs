use std::time::Duration;

/// Errors raised by the push transport.
///
/// None of these ever reach the caller of `connect`; they are reported on the
/// `error` channel and drive the reconnection policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("timed out after {0:?} waiting for the stream to open")]
    Timeout(Duration),
    #[error("stream error: {0}")]
    Stream(String),
    #[error("stream closed by server")]
    Closed,
}

impl TransportError {
    pub fn connection<E: std::fmt::Display>(err: E) -> Self {
        TransportError::Connection(err.to_string())
    }

    /// True when the server answered but refused the stream (4xx).
    pub fn is_server_rejection(&self) -> bool {
        matches!(self, TransportError::Http { status, .. } if (400..500).contains(status))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        Self::Connection(value.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RealtimeError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return Self::Decode(value.to_string());
        }
        Self::Transport(TransportError::from(value))
    }
}

pub type RealtimeResult<T> = Result<T, RealtimeError>;
