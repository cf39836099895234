//! Event type to refresh domain table.
//!
//! The match in [`domains_for`] is exhaustive over [`EventKind`], so adding a
//! kind without deciding which views it refreshes does not compile.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::kind::EventKind;

/// A logical data area that views poll and refresh together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshDomain {
    Tasks,
    Leaves,
    Users,
    Dropdowns,
    PermissionTemplates,
    Meetings,
    Collaborations,
    Dashboard,
}

impl RefreshDomain {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RefreshDomain::Tasks => "tasks",
            RefreshDomain::Leaves => "leaves",
            RefreshDomain::Users => "users",
            RefreshDomain::Dropdowns => "dropdowns",
            RefreshDomain::PermissionTemplates => "permissionTemplates",
            RefreshDomain::Meetings => "meetings",
            RefreshDomain::Collaborations => "collaborations",
            RefreshDomain::Dashboard => "dashboard",
        }
    }

    pub const fn all() -> &'static [RefreshDomain] {
        &[
            RefreshDomain::Tasks,
            RefreshDomain::Leaves,
            RefreshDomain::Users,
            RefreshDomain::Dropdowns,
            RefreshDomain::PermissionTemplates,
            RefreshDomain::Meetings,
            RefreshDomain::Collaborations,
            RefreshDomain::Dashboard,
        ]
    }
}

impl fmt::Display for RefreshDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshDomain {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        RefreshDomain::all()
            .iter()
            .copied()
            .find(|domain| domain.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown refresh domain: {value}"))
    }
}

const TASK_DOMAINS: &[RefreshDomain] = &[RefreshDomain::Tasks, RefreshDomain::Dashboard];
const LEAVE_DOMAINS: &[RefreshDomain] = &[RefreshDomain::Leaves, RefreshDomain::Dashboard];
const USER_DOMAINS: &[RefreshDomain] = &[RefreshDomain::Users];
const DROPDOWN_DOMAINS: &[RefreshDomain] = &[RefreshDomain::Dropdowns];
const PERMISSION_TEMPLATE_DOMAINS: &[RefreshDomain] = &[RefreshDomain::PermissionTemplates];
const MEETING_DOMAINS: &[RefreshDomain] = &[RefreshDomain::Meetings];
const COLLABORATION_DOMAINS: &[RefreshDomain] = &[RefreshDomain::Collaborations];
const FALLBACK_DOMAINS: &[RefreshDomain] = &[RefreshDomain::Dashboard];

/// Domains whose views should refresh when an event of `kind` arrives.
///
/// Unrecognised kinds map to the dashboard so they still cause a visible
/// refresh.
pub fn domains_for(kind: &EventKind) -> &'static [RefreshDomain] {
    match kind {
        EventKind::TaskCreated | EventKind::TaskUpdated | EventKind::TaskDeleted => TASK_DOMAINS,

        EventKind::LeaveCreated
        | EventKind::LeaveUpdated
        | EventKind::LeaveDeleted
        | EventKind::LeaveRequested
        | EventKind::LeaveApproved
        | EventKind::LeaveRejected => LEAVE_DOMAINS,

        EventKind::UserCreated | EventKind::UserUpdated | EventKind::UserDeleted => USER_DOMAINS,

        EventKind::DropdownCreated | EventKind::DropdownUpdated | EventKind::DropdownDeleted => {
            DROPDOWN_DOMAINS
        }

        EventKind::PermissionTemplateCreated
        | EventKind::PermissionTemplateUpdated
        | EventKind::PermissionTemplateDeleted => PERMISSION_TEMPLATE_DOMAINS,

        EventKind::MeetingCreated | EventKind::MeetingUpdated | EventKind::MeetingDeleted => {
            MEETING_DOMAINS
        }

        EventKind::CollaborationCreated
        | EventKind::CollaborationUpdated
        | EventKind::CollaborationDeleted => COLLABORATION_DOMAINS,

        EventKind::Other(_) => FALLBACK_DOMAINS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_events_refresh_tasks_and_dashboard() {
        for kind in [
            EventKind::TaskCreated,
            EventKind::TaskUpdated,
            EventKind::TaskDeleted,
        ] {
            assert_eq!(
                domains_for(&kind),
                &[RefreshDomain::Tasks, RefreshDomain::Dashboard]
            );
        }
    }

    #[test]
    fn leave_decisions_refresh_leaves_and_dashboard() {
        assert_eq!(
            domains_for(&EventKind::LeaveApproved),
            &[RefreshDomain::Leaves, RefreshDomain::Dashboard]
        );
        assert_eq!(
            domains_for(&EventKind::LeaveRequested),
            domains_for(&EventKind::LeaveRejected)
        );
    }

    #[test]
    fn people_and_collaboration_events_are_scoped() {
        assert_eq!(domains_for(&EventKind::UserDeleted), &[RefreshDomain::Users]);
        assert_eq!(
            domains_for(&EventKind::MeetingUpdated),
            &[RefreshDomain::Meetings]
        );
        assert_eq!(
            domains_for(&EventKind::CollaborationCreated),
            &[RefreshDomain::Collaborations]
        );
    }

    #[test]
    fn unknown_kinds_fall_back_to_dashboard() {
        let kind = EventKind::Other("somethingNew".into());
        assert_eq!(domains_for(&kind), &[RefreshDomain::Dashboard]);
    }

    #[test]
    fn every_known_kind_refreshes_something() {
        for kind in EventKind::known() {
            assert!(!domains_for(kind).is_empty(), "{kind} maps to nothing");
        }
    }

    #[test]
    fn domain_names_parse_back() {
        for domain in RefreshDomain::all() {
            assert_eq!(domain.as_str().parse::<RefreshDomain>(), Ok(*domain));
        }
        assert_eq!(
            "permissiontemplates".parse::<RefreshDomain>(),
            Ok(RefreshDomain::PermissionTemplates)
        );
        assert!("payroll".parse::<RefreshDomain>().is_err());
    }
}
