//! Closed set of push event types.
//!
//! The server sends camelCase type names (`taskCreated`, `leaveApproved`, ...).
//! Anything outside the known set is kept verbatim in [`EventKind::Other`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    TaskCreated,
    TaskUpdated,
    TaskDeleted,

    LeaveCreated,
    LeaveUpdated,
    LeaveDeleted,
    LeaveRequested,
    LeaveApproved,
    LeaveRejected,

    UserCreated,
    UserUpdated,
    UserDeleted,

    DropdownCreated,
    DropdownUpdated,
    DropdownDeleted,

    PermissionTemplateCreated,
    PermissionTemplateUpdated,
    PermissionTemplateDeleted,

    MeetingCreated,
    MeetingUpdated,
    MeetingDeleted,

    CollaborationCreated,
    CollaborationUpdated,
    CollaborationDeleted,

    /// A type name this client does not know about.
    Other(String),
}

const KNOWN: &[EventKind] = &[
    EventKind::TaskCreated,
    EventKind::TaskUpdated,
    EventKind::TaskDeleted,
    EventKind::LeaveCreated,
    EventKind::LeaveUpdated,
    EventKind::LeaveDeleted,
    EventKind::LeaveRequested,
    EventKind::LeaveApproved,
    EventKind::LeaveRejected,
    EventKind::UserCreated,
    EventKind::UserUpdated,
    EventKind::UserDeleted,
    EventKind::DropdownCreated,
    EventKind::DropdownUpdated,
    EventKind::DropdownDeleted,
    EventKind::PermissionTemplateCreated,
    EventKind::PermissionTemplateUpdated,
    EventKind::PermissionTemplateDeleted,
    EventKind::MeetingCreated,
    EventKind::MeetingUpdated,
    EventKind::MeetingDeleted,
    EventKind::CollaborationCreated,
    EventKind::CollaborationUpdated,
    EventKind::CollaborationDeleted,
];

impl EventKind {
    /// Every named kind, excluding `Other`.
    pub fn known() -> &'static [EventKind] {
        KNOWN
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::TaskCreated => "taskCreated",
            EventKind::TaskUpdated => "taskUpdated",
            EventKind::TaskDeleted => "taskDeleted",
            EventKind::LeaveCreated => "leaveCreated",
            EventKind::LeaveUpdated => "leaveUpdated",
            EventKind::LeaveDeleted => "leaveDeleted",
            EventKind::LeaveRequested => "leaveRequested",
            EventKind::LeaveApproved => "leaveApproved",
            EventKind::LeaveRejected => "leaveRejected",
            EventKind::UserCreated => "userCreated",
            EventKind::UserUpdated => "userUpdated",
            EventKind::UserDeleted => "userDeleted",
            EventKind::DropdownCreated => "dropdownCreated",
            EventKind::DropdownUpdated => "dropdownUpdated",
            EventKind::DropdownDeleted => "dropdownDeleted",
            EventKind::PermissionTemplateCreated => "permissionTemplateCreated",
            EventKind::PermissionTemplateUpdated => "permissionTemplateUpdated",
            EventKind::PermissionTemplateDeleted => "permissionTemplateDeleted",
            EventKind::MeetingCreated => "meetingCreated",
            EventKind::MeetingUpdated => "meetingUpdated",
            EventKind::MeetingDeleted => "meetingDeleted",
            EventKind::CollaborationCreated => "collaborationCreated",
            EventKind::CollaborationUpdated => "collaborationUpdated",
            EventKind::CollaborationDeleted => "collaborationDeleted",
            EventKind::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventKind::Other(_))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(KNOWN
            .iter()
            .find(|kind| kind.as_str() == value)
            .cloned()
            .unwrap_or_else(|| EventKind::Other(value.to_string())))
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match KNOWN.iter().find(|kind| kind.as_str() == value) {
            Some(kind) => kind.clone(),
            None => EventKind::Other(value),
        }
    }
}

impl From<EventKind> for String {
    fn from(value: EventKind) -> Self {
        match value {
            EventKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}
