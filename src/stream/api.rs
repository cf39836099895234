//! REST side of the notification feature: the server keeps a backlog of
//! notifications per user that can be fetched or cleared.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::RealtimeConfig;
use crate::error::{RealtimeError, RealtimeResult};
use crate::events::Notification;

#[derive(Deserialize)]
#[serde(untagged)]
enum Backlog {
    List(Vec<serde_json::Value>),
    Wrapped { notifications: Vec<serde_json::Value> },
}

#[derive(Debug, Clone)]
pub struct NotificationApi {
    client: reqwest::Client,
    url: String,
}

impl NotificationApi {
    pub fn new(config: &RealtimeConfig) -> RealtimeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| RealtimeError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &RealtimeConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            url: config.notifications_url(),
        }
    }

    /// Fetch the notifications the server has stored, in server order.
    ///
    /// Items that are not notification objects are skipped. A `createdAt`
    /// RFC 3339 timestamp, when present, becomes the receive time.
    pub async fn fetch_stored_notifications(&self) -> RealtimeResult<Vec<Notification>> {
        let response = self.client.get(&self.url).send().await?;
        let response = check_status(response).await?;
        let backlog: Backlog = response.json().await?;
        let items = match backlog {
            Backlog::List(items) => items,
            Backlog::Wrapped { notifications } => notifications,
        };

        let total = items.len();
        let notifications: Vec<Notification> = items
            .into_iter()
            .filter_map(|item| {
                let received_at = created_at(&item).unwrap_or_else(Utc::now);
                match Notification::from_value(item, received_at) {
                    Ok(notification) => Some(notification),
                    Err(err) => {
                        warn!(error = %err, "skipping malformed stored notification");
                        None
                    }
                }
            })
            .collect();
        debug!(total, kept = notifications.len(), "fetched stored notifications");
        Ok(notifications)
    }

    /// Delete the stored backlog on the server.
    pub async fn clear_stored_notifications(&self) -> RealtimeResult<()> {
        let response = self.client.delete(&self.url).send().await?;
        check_status(response).await?;
        debug!("cleared stored notifications");
        Ok(())
    }
}

fn created_at(item: &serde_json::Value) -> Option<DateTime<Utc>> {
    let raw = item.get("createdAt")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

async fn check_status(response: reqwest::Response) -> RealtimeResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(RealtimeError::Http {
        status: status.as_u16(),
        message,
    })
}
