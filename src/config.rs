//! Runtime configuration for the realtime pipeline.
//!
//! Values come from the environment (optionally seeded from a `.env` file) and
//! fall back to the defaults the dashboard has always used: a 1 s linear
//! backoff unit, 5 reconnect attempts, 100 buffered notifications and a 30 s
//! poll interval.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RealtimeError, RealtimeResult};

pub const ENV_API_BASE_URL: &str = "REALTIME_API_BASE_URL";
pub const ENV_RECONNECT_BASE_MS: &str = "REALTIME_RECONNECT_BASE_MS";
pub const ENV_MAX_RECONNECT_ATTEMPTS: &str = "REALTIME_MAX_RECONNECT_ATTEMPTS";
pub const ENV_HISTORY_CAPACITY: &str = "REALTIME_HISTORY_CAPACITY";
pub const ENV_POLL_INTERVAL_MS: &str = "REALTIME_POLL_INTERVAL_MS";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "REALTIME_CONNECT_TIMEOUT_MS";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_RECONNECT_BASE_MS: u64 = 1_000;
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub default_poll_interval_ms: u64,
    /// `None` waits for the stream to open indefinitely.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_reconnect_base_ms() -> u64 {
    DEFAULT_RECONNECT_BASE_MS
}

fn default_max_reconnect_attempts() -> u32 {
    DEFAULT_MAX_RECONNECT_ATTEMPTS
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            reconnect_base_ms: DEFAULT_RECONNECT_BASE_MS,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            default_poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            connect_timeout_ms: None,
        }
    }
}

impl RealtimeConfig {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first if present; real
    /// environment variables win over it.
    pub fn from_env() -> RealtimeResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> RealtimeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_API_BASE_URL) {
            config.api_base_url = url.trim().to_string();
        }
        if let Some(ms) = parse_var(&lookup, ENV_RECONNECT_BASE_MS)? {
            config.reconnect_base_ms = ms;
        }
        if let Some(attempts) = parse_var(&lookup, ENV_MAX_RECONNECT_ATTEMPTS)? {
            config.max_reconnect_attempts = attempts;
        }
        if let Some(capacity) = parse_var(&lookup, ENV_HISTORY_CAPACITY)? {
            config.history_capacity = capacity;
        }
        if let Some(ms) = parse_var(&lookup, ENV_POLL_INTERVAL_MS)? {
            config.default_poll_interval_ms = ms;
        }
        config.connect_timeout_ms = parse_var(&lookup, ENV_CONNECT_TIMEOUT_MS)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RealtimeResult<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(RealtimeError::Config("api_base_url must not be empty".into()));
        }
        if self.reconnect_base_ms == 0 {
            return Err(RealtimeError::Config(
                "reconnect_base_ms must be greater than zero".into(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(RealtimeError::Config(
                "history_capacity must be greater than zero".into(),
            ));
        }
        if self.default_poll_interval_ms == 0 {
            return Err(RealtimeError::Config(
                "default_poll_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_reconnect(mut self, base_delay: Duration, max_attempts: u32) -> Self {
        self.reconnect_base_ms = base_delay.as_millis() as u64;
        self.max_reconnect_attempts = max_attempts;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_ms)
    }

    pub fn default_poll_interval(&self) -> Duration {
        Duration::from_millis(self.default_poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    fn base(&self) -> &str {
        self.api_base_url.trim().trim_end_matches('/')
    }

    /// URL of the push channel scoped to one user.
    pub fn stream_url(&self, client_id: &str) -> String {
        format!(
            "{}/api/notifications?userId={}",
            self.base(),
            urlencoding::encode(client_id)
        )
    }

    /// URL of the stored-notification backlog.
    pub fn notifications_url(&self) -> String {
        format!("{}/api/notifications", self.base())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> RealtimeResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| RealtimeError::Config(format!("{key}={raw}: {e}"))),
    }
}
