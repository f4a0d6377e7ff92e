//! Queue directory event types.

use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

/// Event forwarded from the notification backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// A path appeared in the queue directory, by creation or by being moved in.
    Arrived(PathBuf),
    /// A path left the queue directory, by removal or by being moved out.
    Removed(PathBuf),
    /// The notification backend reported an error.
    Error(String),
}

impl QueueEvent {
    /// Translate a raw notification into queue events.
    ///
    /// A two-sided rename yields the removal of the old name followed by the
    /// arrival of the new one. Modifications and access yield nothing.
    #[must_use]
    pub fn from_notify(event: &Event) -> Vec<Self> {
        match (event.kind, event.paths.as_slice()) {
            (EventKind::Modify(ModifyKind::Name(RenameMode::Both)), [from, .., to]) => {
                vec![Self::Removed(from.clone()), Self::Arrived(to.clone())]
            }
            (kind, [.., last]) if is_arrival(kind) => vec![Self::Arrived(last.clone())],
            (kind, [first, ..]) if is_removal(kind) => vec![Self::Removed(first.clone())],
            _ => Vec::new(),
        }
    }

    /// Path the event refers to.
    #[must_use]
    pub const fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Arrived(p) | Self::Removed(p) => Some(p),
            Self::Error(_) => None,
        }
    }
}

/// Whether an event kind means a new name now exists in the directory.
#[must_use]
pub const fn is_arrival(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Name(
                RenameMode::To | RenameMode::Both | RenameMode::Any
            ))
    )
}

/// Whether an event kind means a name is gone from the directory.
#[must_use]
pub const fn is_removal(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From))
    )
}
