/**
 * Membership Change Events
 *
 * Events published by the membership cache whenever its visible state
 * changes. Every live view subscribes once and updates itself from these
 * instead of re-fetching when it regains focus.
 */
use crate::shared::catalog::{CardId, MembershipSet};
use serde::{Deserialize, Serialize};

/// What happened to a membership set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MembershipChangeKind {
    /// A refresh replaced the whole snapshot
    Refreshed { count: usize },
    /// A card was inserted optimistically
    Added { card_id: CardId },
    /// A card was removed optimistically
    Removed { card_id: CardId },
    /// The server confirmed an optimistic mutation
    Confirmed { card_id: CardId },
    /// An optimistic mutation failed and was reverted
    RolledBack { card_id: CardId },
    /// All state was dropped (logout)
    Reset,
}

/// Event broadcast to every subscriber of the membership cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MembershipEvent {
    /// Affected set; `None` for a reset of both sets
    pub set: Option<MembershipSet>,
    pub change: MembershipChangeKind,
    /// Timestamp when the event occurred
    pub timestamp: String,
}

impl MembershipEvent {
    /// Create a new event for one set
    pub fn new(set: MembershipSet, change: MembershipChangeKind) -> Self {
        Self {
            set: Some(set),
            change,
            timestamp: get_timestamp(),
        }
    }

    pub fn reset() -> Self {
        Self {
            set: None,
            change: MembershipChangeKind::Reset,
            timestamp: get_timestamp(),
        }
    }

    /// Card the event is about, if any
    pub fn card_id(&self) -> Option<CardId> {
        match self.change {
            MembershipChangeKind::Added { card_id }
            | MembershipChangeKind::Removed { card_id }
            | MembershipChangeKind::Confirmed { card_id }
            | MembershipChangeKind::RolledBack { card_id } => Some(card_id),
            MembershipChangeKind::Refreshed { .. } | MembershipChangeKind::Reset => None,
        }
    }

    /// Whether a view showing `set` needs to redraw
    pub fn affects(&self, set: MembershipSet) -> bool {
        self.set.map_or(true, |s| s == set)
    }
}

fn get_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
