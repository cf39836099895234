//! Typed listener shortcuts.
//!
//! Each method is a thin wrapper over [`EventStreamClient::on`] for one
//! channel, handing the listener the [`Notification`] (or the lifecycle detail)
//! instead of the raw [`StreamSignal`].

use super::client::EventStreamClient;
use crate::error::TransportError;
use crate::events::{Channel, DisconnectReason, EventKind, ListenerId, Notification, StreamSignal};

macro_rules! typed_listeners {
    ($($method:ident => $kind:ident),+ $(,)?) => {
        impl EventStreamClient {
            $(
                #[doc = concat!("Listen for `", stringify!($kind), "` notifications.")]
                pub fn $method<F>(&self, listener: F) -> ListenerId
                where
                    F: Fn(&Notification) + Send + Sync + 'static,
                {
                    self.on_kind(EventKind::$kind, listener)
                }
            )+
        }
    };
}

typed_listeners! {
    on_task_created => TaskCreated,
    on_task_updated => TaskUpdated,
    on_task_deleted => TaskDeleted,
    on_leave_created => LeaveCreated,
    on_leave_updated => LeaveUpdated,
    on_leave_deleted => LeaveDeleted,
    on_leave_requested => LeaveRequested,
    on_leave_approved => LeaveApproved,
    on_leave_rejected => LeaveRejected,
    on_user_created => UserCreated,
    on_user_updated => UserUpdated,
    on_user_deleted => UserDeleted,
    on_dropdown_created => DropdownCreated,
    on_dropdown_updated => DropdownUpdated,
    on_dropdown_deleted => DropdownDeleted,
    on_permission_template_created => PermissionTemplateCreated,
    on_permission_template_updated => PermissionTemplateUpdated,
    on_permission_template_deleted => PermissionTemplateDeleted,
    on_meeting_created => MeetingCreated,
    on_meeting_updated => MeetingUpdated,
    on_meeting_deleted => MeetingDeleted,
    on_collaboration_created => CollaborationCreated,
    on_collaboration_updated => CollaborationUpdated,
    on_collaboration_deleted => CollaborationDeleted,
}

impl EventStreamClient {
    /// Listen for one event type, including types unknown to this client.
    pub fn on_kind<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.on(Channel::Event(kind), notification_only(listener))
    }

    /// Listen for every notification regardless of type.
    pub fn on_all_notifications<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.on(Channel::Notification, notification_only(listener))
    }

    pub fn on_connected<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on(Channel::Connected, move |signal: &StreamSignal| {
            if let StreamSignal::Connected { client_id } = signal {
                listener(client_id);
            }
        })
    }

    pub fn on_disconnected<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(DisconnectReason) + Send + Sync + 'static,
    {
        self.on(Channel::Disconnected, move |signal: &StreamSignal| {
            if let StreamSignal::Disconnected { reason } = signal {
                listener(*reason);
            }
        })
    }

    pub fn on_error<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&TransportError) + Send + Sync + 'static,
    {
        self.on(Channel::Error, move |signal: &StreamSignal| {
            if let StreamSignal::Error(err) = signal {
                listener(err);
            }
        })
    }
}

fn notification_only<F>(listener: F) -> impl Fn(&StreamSignal) + Send + Sync + 'static
where
    F: Fn(&Notification) + Send + Sync + 'static,
{
    move |signal: &StreamSignal| {
        if let Some(notification) = signal.notification() {
            listener(notification);
        }
    }
}
