use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kind::EventKind;

/// Why an inbound frame could not become a [`Notification`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("frame body must be a JSON object")]
    NotAnObject,
    #[error("frame has no string `type` field")]
    MissingType,
}

/// One push notification. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: EventKind,
    /// The full frame object, `type` included.
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl Notification {
    pub fn from_frame(body: &str) -> Result<Self, FrameError> {
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| FrameError::InvalidJson(e.to_string()))?;
        Self::from_value(value, Utc::now())
    }

    pub fn from_value(
        payload: serde_json::Value,
        received_at: DateTime<Utc>,
    ) -> Result<Self, FrameError> {
        let object = payload.as_object().ok_or(FrameError::NotAnObject)?;
        let kind = object
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or(FrameError::MissingType)?
            .to_string();

        Ok(Self {
            id: Uuid::new_v4(),
            kind: EventKind::from(kind),
            payload,
            received_at,
        })
    }

    /// Convenience accessor for a top-level payload field.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.payload.get(name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_known_frame() {
        let n = Notification::from_frame(r#"{"type":"taskCreated","task":{"description":"Fix bug"}}"#)
            .unwrap();
        assert_eq!(n.kind, EventKind::TaskCreated);
        assert_eq!(n.field("task"), Some(&json!({ "description": "Fix bug" })));
        assert_eq!(n.field("type"), Some(&json!("taskCreated")));
    }

    #[test]
    fn unknown_type_is_kept() {
        let n = Notification::from_frame(r#"{"type":"somethingNew"}"#).unwrap();
        assert_eq!(n.kind, EventKind::Other("somethingNew".into()));
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(
            Notification::from_frame("{not json"),
            Err(FrameError::InvalidJson(_))
        ));
        assert_eq!(
            Notification::from_frame("[1,2]").unwrap_err(),
            FrameError::NotAnObject
        );
        assert_eq!(
            Notification::from_frame(r#"{"type":42}"#).unwrap_err(),
            FrameError::MissingType
        );
        assert_eq!(
            Notification::from_frame(r#"{"task":{}}"#).unwrap_err(),
            FrameError::MissingType
        );
    }
}
