//! # Optimistic Mutation Ledger
//!
//! Tracks membership mutations that have been applied to the cache but not
//! yet confirmed by the server. Each entry carries enough to undo itself.
//!
//! A mutation is applied, then either committed (server said yes) or rolled
//! back (server said no). While pending, it is re-applied on top of every
//! refreshed snapshot so a refresh never hides an in-flight toggle.
//!
//! Committing stamps the mutation with the refresh ticket counter of that
//! moment. A refresh whose request went out before the commit may still
//! return a list without it, so committed mutations stay replayable for
//! refreshes with a ticket at or below their stamp until those finish.

use crate::shared::catalog::{CardId, MembershipRecord, MembershipSet};
use std::collections::HashMap;
use uuid::Uuid;

/// Direction of a pending mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingKind {
    /// `inserted` is false when the card was already cached before the add
    Add { inserted: bool },
    /// Records taken out of the cache, restored on rollback
    Remove { removed: Vec<MembershipRecord> },
}

/// One unconfirmed mutation
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub id: Uuid,
    pub set: MembershipSet,
    pub card_id: CardId,
    pub kind: PendingKind,
    seq: u64,
}

impl PendingMutation {
    /// Re-apply this mutation to a freshly fetched snapshot
    pub fn replay(&self, records: &mut Vec<MembershipRecord>) {
        match &self.kind {
            PendingKind::Add { .. } => {
                if !records.iter().any(|r| r.card_id == self.card_id) {
                    records.push(MembershipRecord::new(self.set, self.card_id, None));
                }
            }
            PendingKind::Remove { .. } => records.retain(|r| r.card_id != self.card_id),
        }
    }

    /// Undo this mutation on the current records
    pub fn revert(&self, records: &mut Vec<MembershipRecord>) {
        match &self.kind {
            PendingKind::Add { inserted: true } => records.retain(|r| r.card_id != self.card_id),
            PendingKind::Add { inserted: false } => {}
            PendingKind::Remove { removed } => {
                if !records.iter().any(|r| r.card_id == self.card_id) {
                    records.extend(removed.iter().cloned());
                }
            }
        }
    }
}

#[derive(Debug)]
struct Committed {
    mutation: PendingMutation,
    stamp: u64,
}

/// Ledger of pending optimistic mutations
#[derive(Debug, Default)]
pub struct PendingMutations {
    entries: HashMap<Uuid, PendingMutation>,
    committed: Vec<Committed>,
    next_seq: u64,
}

impl PendingMutations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an applied mutation and return its id
    pub fn begin(&mut self, set: MembershipSet, card_id: CardId, kind: PendingKind) -> Uuid {
        let id = Uuid::new_v4();
        self.next_seq += 1;
        self.entries.insert(
            id,
            PendingMutation {
                id,
                set,
                card_id,
                kind,
                seq: self.next_seq,
            },
        );
        id
    }

    /// The server confirmed the mutation. `stamp` is the newest refresh
    /// ticket issued so far.
    pub fn commit(&mut self, id: &Uuid, stamp: u64) -> Option<PendingMutation> {
        let mutation = self.entries.remove(id)?;
        self.committed.push(Committed {
            mutation: mutation.clone(),
            stamp,
        });
        Some(mutation)
    }

    /// The server rejected the mutation; the caller reverts it
    pub fn rollback(&mut self, id: &Uuid) -> Option<PendingMutation> {
        self.entries.remove(id)
    }

    /// Pending mutations of one set, oldest first
    pub fn for_set(&self, set: MembershipSet) -> Vec<&PendingMutation> {
        let mut pending: Vec<&PendingMutation> =
            self.entries.values().filter(|m| m.set == set).collect();
        pending.sort_by_key(|m| m.seq);
        pending
    }

    /// What a refresh holding `ticket` replays on its snapshot: pending
    /// mutations plus those committed after the ticket was issued, oldest first
    pub fn replay_for(&self, set: MembershipSet, ticket: u64) -> Vec<&PendingMutation> {
        let mut replay = self.for_set(set);
        replay.extend(
            self.committed
                .iter()
                .filter(|c| c.mutation.set == set && c.stamp >= ticket)
                .map(|c| &c.mutation),
        );
        replay.sort_by_key(|m| m.seq);
        replay
    }

    /// Forget committed mutations of `set` that no refresh still needs.
    /// `in_flight` is the ticket of the set's running refresh, if any.
    pub fn prune_committed(&mut self, set: MembershipSet, in_flight: Option<u64>) {
        self.committed
            .retain(|c| c.mutation.set != set || in_flight.is_some_and(|t| t <= c.stamp));
    }

    /// Committed mutations kept for running refreshes
    pub fn committed_count(&self) -> usize {
        self.committed.len()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.entries.contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Drop everything (logout)
    pub fn clear(&mut self) {
        self.entries.clear();
        self.committed.clear();
    }
}
