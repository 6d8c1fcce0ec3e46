//! Mutation notifications.
//!
//! Every mutation reports its progress to an injected [`Notifier`]. Each
//! notification carries a closed action, a phase, and a small payload; its
//! type tag reads `"<ACTION>/<PHASE>"`, e.g. `"EDIT_ITEM/SUCCESS"`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::cache::mutex_lock;

const SOURCE: &str = "notify";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    PostItem,
    UploadFiles,
    EditItem,
    DeleteItems,
    MoveItems,
    CopyItems,
    RecycleItems,
    RestoreItems,
    PutItemGeolocation,
    DeleteItemGeolocation,
    EditMember,
    PostItemMembership,
    EditItemMembership,
    DeleteItemMembership,
    PostChatMessage,
    PatchChatMessage,
    DeleteChatMessage,
    ClearItemChat,
    PostItemTag,
    DeleteItemTag,
    SubscribeToItem,
    UnsubscribeFromItem,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::PostItem => "POST_ITEM",
            Action::UploadFiles => "UPLOAD_FILES",
            Action::EditItem => "EDIT_ITEM",
            Action::DeleteItems => "DELETE_ITEMS",
            Action::MoveItems => "MOVE_ITEMS",
            Action::CopyItems => "COPY_ITEMS",
            Action::RecycleItems => "RECYCLE_ITEMS",
            Action::RestoreItems => "RESTORE_ITEMS",
            Action::PutItemGeolocation => "PUT_ITEM_GEOLOCATION",
            Action::DeleteItemGeolocation => "DELETE_ITEM_GEOLOCATION",
            Action::EditMember => "EDIT_MEMBER",
            Action::PostItemMembership => "POST_ITEM_MEMBERSHIP",
            Action::EditItemMembership => "EDIT_ITEM_MEMBERSHIP",
            Action::DeleteItemMembership => "DELETE_ITEM_MEMBERSHIP",
            Action::PostChatMessage => "POST_ITEM_CHAT_MESSAGE",
            Action::PatchChatMessage => "PATCH_ITEM_CHAT_MESSAGE",
            Action::DeleteChatMessage => "DELETE_ITEM_CHAT_MESSAGE",
            Action::ClearItemChat => "CLEAR_ITEM_CHAT",
            Action::PostItemTag => "POST_ITEM_TAG",
            Action::DeleteItemTag => "DELETE_ITEM_TAG",
            Action::SubscribeToItem => "SUBSCRIBE_TO_ITEM",
            Action::UnsubscribeFromItem => "UNSUBSCRIBE_FROM_ITEM",
        }
    }

    /// Message id attached to successful settlements.
    pub fn success_message(self) -> &'static str {
        match self {
            Action::PostItem | Action::UploadFiles | Action::CopyItems => "ITEMS_CREATED",
            Action::EditItem | Action::EditMember => "CHANGES_SAVED",
            Action::DeleteItems => "ITEMS_DELETED",
            Action::MoveItems => "ITEMS_MOVED",
            Action::RecycleItems => "ITEMS_RECYCLED",
            Action::RestoreItems => "ITEMS_RESTORED",
            Action::PutItemGeolocation | Action::DeleteItemGeolocation => "GEOLOCATION_SAVED",
            Action::PostItemMembership
            | Action::EditItemMembership
            | Action::DeleteItemMembership => "MEMBERSHIPS_SAVED",
            Action::PostChatMessage
            | Action::PatchChatMessage
            | Action::DeleteChatMessage
            | Action::ClearItemChat => "CHAT_SAVED",
            Action::PostItemTag | Action::DeleteItemTag => "TAGS_SAVED",
            Action::SubscribeToItem | Action::UnsubscribeFromItem => "SUBSCRIPTIONS_SAVED",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The mutation was started and its optimistic write applied.
    Trigger,
    /// The request is about to be sent.
    Request,
    Failure,
    Success,
    /// Settlement invalidations have run.
    Fulfill,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Trigger => "TRIGGER",
            Phase::Request => "REQUEST",
            Phase::Failure => "FAILURE",
            Phase::Success => "SUCCESS",
            Phase::Fulfill => "FULFILL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Empty,
    Message(&'static str),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub action: Action,
    pub phase: Phase,
    pub payload: Payload,
    pub timestamp: OffsetDateTime,
}

impl Notification {
    pub fn new(action: Action, phase: Phase, payload: Payload) -> Self {
        Self {
            action,
            phase,
            payload,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn success(action: Action) -> Self {
        Self::new(action, Phase::Success, Payload::Message(action.success_message()))
    }

    pub fn failure(action: Action, error: &impl fmt::Display) -> Self {
        Self::new(action, Phase::Failure, Payload::Error(error.to_string()))
    }

    /// `"<ACTION>/<PHASE>"`.
    pub fn type_tag(&self) -> String {
        format!("{}/{}", self.action.as_str(), self.phase.as_str())
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Logs notifications through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        let kind = notification.type_tag();
        match (&notification.phase, &notification.payload) {
            (Phase::Failure, Payload::Error(error)) => {
                warn!(notification = %kind, error = %error, "Mutation failed");
            }
            (Phase::Success, Payload::Message(message)) => {
                info!(notification = %kind, message_id = *message, "Mutation succeeded");
            }
            _ => debug!(notification = %kind, "Mutation progress"),
        }
    }
}

const DEFAULT_LOG_CAPACITY: usize = 1024;

/// In-memory FIFO of received notifications. Once full, the oldest entry
/// is dropped for each new one.
#[derive(Debug)]
pub struct NotificationLog {
    entries: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log keeping at most `capacity` notifications (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove and return every recorded notification, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        mutex_lock(&self.entries, SOURCE, "drain").drain(..).collect()
    }

    /// Type tags of the recorded notifications, oldest first.
    pub fn types(&self) -> Vec<String> {
        mutex_lock(&self.entries, SOURCE, "types")
            .iter()
            .map(Notification::type_tag)
            .collect()
    }

    /// Recorded notifications in `phase`, oldest first.
    pub fn in_phase(&self, phase: Phase) -> Vec<Notification> {
        mutex_lock(&self.entries, SOURCE, "in_phase")
            .iter()
            .filter(|n| n.phase == phase)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        mutex_lock(&self.entries, SOURCE, "clear").clear();
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: &Notification) {
        let mut entries = mutex_lock(&self.entries, SOURCE, "notify");
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(notification.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn type_tag_joins_action_and_phase() {
        let success = Notification::success(Action::EditItem);
        assert_eq!(success.type_tag(), "EDIT_ITEM/SUCCESS");
        assert_eq!(success.payload, Payload::Message("CHANGES_SAVED"));

        let failure = Notification::failure(Action::DeleteItems, &"forbidden");
        assert_eq!(failure.type_tag(), "DELETE_ITEMS/FAILURE");
        assert_eq!(failure.payload, Payload::Error("forbidden".into()));
    }

    #[test]
    fn log_keeps_fifo_order() {
        let log = NotificationLog::new();
        log.notify(&Notification::new(Action::MoveItems, Phase::Request, Payload::Empty));
        log.notify(&Notification::success(Action::MoveItems));

        assert_eq!(log.types(), vec!["MOVE_ITEMS/REQUEST", "MOVE_ITEMS/SUCCESS"]);
        assert_eq!(log.in_phase(Phase::Success).len(), 1);

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].phase, Phase::Request);
        assert!(log.is_empty());
    }

    #[test]
    fn full_log_drops_oldest_entries() {
        let log = NotificationLog::with_capacity(2);
        log.notify(&Notification::new(Action::CopyItems, Phase::Trigger, Payload::Empty));
        log.notify(&Notification::new(Action::CopyItems, Phase::Request, Payload::Empty));
        log.notify(&Notification::success(Action::CopyItems));

        assert_eq!(log.len(), 2);
        assert_eq!(log.types(), vec!["COPY_ITEMS/REQUEST", "COPY_ITEMS/SUCCESS"]);
    }

    #[test]
    fn log_recovers_from_poisoned_lock() {
        let log = NotificationLog::new();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = log.entries.lock().expect("log lock should be acquired");
            panic!("poison log lock");
        }));

        log.notify(&Notification::success(Action::PostItem));
        assert_eq!(log.len(), 1);
    }
}
