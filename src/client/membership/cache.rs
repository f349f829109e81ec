//! # Membership Cache
//!
//! Client-side projection of which cards are in the user's wishlist and
//! collection.
//!
//! ## Lifecycle per set
//!
//! ```text
//! Empty --refresh--> Loading --ok--> Ready --refresh--> Loading --ok--> Ready
//!                       |                                  |
//!                       +--error--> Empty                  +--error--> Ready
//! ```
//!
//! `Ready` changes in place through optimistic `add`/`remove`. A mutation is
//! written to the cache first, then sent to the server, then either confirmed
//! or reverted. Pending mutations survive a refresh: they are replayed on top
//! of every new snapshot until the server answers.
//!
//! ## Concurrency
//!
//! - Mutations on the same `(set, card)` are serialized by a keyed lock.
//! - Every refresh takes a ticket; only the newest ticket of a set may apply
//!   its result. Older refreshes finishing late return [`ClientError::Cancelled`].
//! - Mutations committed while a refresh is in flight are replayed on its
//!   result, which may predate them.
//! - State is only locked for short synchronous sections, never across a
//!   network call.

use super::locks::KeyedLocks;
use super::optimistic::{PendingKind, PendingMutations};
use super::remote::MembershipApi;
use super::scope::{ScopeToken, ViewScope};
use crate::shared::catalog::{CardId, MembershipId, MembershipRecord, MembershipSet};
use crate::shared::config::DuplicatePolicy;
use crate::shared::error::{ClientError, ClientResult};
use crate::shared::event::{MembershipChangeKind, MembershipEvent};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;

/// Load phase of one membership set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetPhase {
    /// Never loaded (or reset)
    Empty,
    /// A refresh is in flight
    Loading,
    /// Holds the last successful snapshot plus optimistic changes
    Ready,
}

/// What to remove: a card, or a server-side membership entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipTarget {
    Card(CardId),
    Entry(MembershipId),
}

impl From<CardId> for MembershipTarget {
    fn from(card_id: CardId) -> Self {
        Self::Card(card_id)
    }
}

impl From<MembershipId> for MembershipTarget {
    fn from(entry_id: MembershipId) -> Self {
        Self::Entry(entry_id)
    }
}

/// Outcome of [`MembershipCache::toggle`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipChange {
    pub set: MembershipSet,
    pub card_id: CardId,
    /// Membership after the toggle
    pub member: bool,
    /// The new record when the card was added
    pub record: Option<MembershipRecord>,
}

#[derive(Debug, Default)]
struct SetState {
    records: Vec<MembershipRecord>,
    loaded: bool,
    /// Ticket of the newest refresh still in flight
    in_flight: Option<u64>,
}

impl SetState {
    fn phase(&self) -> SetPhase {
        if self.in_flight.is_some() {
            SetPhase::Loading
        } else if self.loaded {
            SetPhase::Ready
        } else {
            SetPhase::Empty
        }
    }

    fn contains(&self, card_id: CardId) -> bool {
        self.records.iter().any(|r| r.card_id == card_id)
    }

    fn take_card(&mut self, card_id: CardId) -> Vec<MembershipRecord> {
        let (removed, kept) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| r.card_id == card_id);
        self.records = kept;
        removed
    }
}

#[derive(Debug, Default)]
struct CacheState {
    sets: HashMap<MembershipSet, SetState>,
    pending: PendingMutations,
    next_ticket: u64,
}

#[derive(Debug)]
struct Shared {
    remote: MembershipApi,
    state: RwLock<CacheState>,
    locks: KeyedLocks<(MembershipSet, CardId)>,
    events: broadcast::Sender<MembershipEvent>,
}

/// Shared membership cache. Cloning is cheap; clones see the same state.
#[derive(Debug, Clone)]
pub struct MembershipCache {
    shared: Arc<Shared>,
}

impl MembershipCache {
    pub fn new(remote: MembershipApi) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                remote,
                state: RwLock::new(CacheState::default()),
                locks: KeyedLocks::new(),
                events,
            }),
        }
    }

    /// Receive every change applied to the cache
    pub fn subscribe(&self) -> broadcast::Receiver<MembershipEvent> {
        self.shared.events.subscribe()
    }

    /// Open a scope for one live view
    pub fn scope(&self) -> ViewScope {
        ViewScope::new()
    }

    fn policy(&self, set: MembershipSet) -> DuplicatePolicy {
        self.shared.remote.api().config().app().duplicate_policy(set)
    }

    fn emit(&self, event: MembershipEvent) {
        if self.shared.events.send(event).is_err() {
            tracing::trace!("[Membership] Event dropped, no subscribers");
        }
    }

    // ---- queries ----

    pub async fn contains(&self, set: MembershipSet, card_id: CardId) -> bool {
        let state = self.shared.state.read().await;
        state.sets.get(&set).is_some_and(|s| s.contains(card_id))
    }

    pub async fn records(&self, set: MembershipSet) -> Vec<MembershipRecord> {
        let state = self.shared.state.read().await;
        state
            .sets
            .get(&set)
            .map(|s| s.records.clone())
            .unwrap_or_default()
    }

    pub async fn phase(&self, set: MembershipSet) -> SetPhase {
        let state = self.shared.state.read().await;
        state.sets.get(&set).map_or(SetPhase::Empty, SetState::phase)
    }

    pub async fn count(&self, set: MembershipSet) -> usize {
        let state = self.shared.state.read().await;
        state.sets.get(&set).map_or(0, |s| s.records.len())
    }

    /// Optimistic mutations still waiting for the server
    pub async fn pending_count(&self) -> usize {
        self.shared.state.read().await.pending.count()
    }

    // ---- refresh ----

    /// Replace the cached set with the server's list
    pub async fn refresh(&self, set: MembershipSet) -> ClientResult<Vec<MembershipRecord>> {
        self.refresh_scoped(set, None).await
    }

    /// Refresh on behalf of a view. The result is discarded with
    /// [`ClientError::Cancelled`] if the view's scope closed meanwhile.
    pub async fn refresh_in(
        &self,
        scope: &ScopeToken,
        set: MembershipSet,
    ) -> ClientResult<Vec<MembershipRecord>> {
        self.refresh_scoped(set, Some(scope)).await
    }

    async fn refresh_scoped(
        &self,
        set: MembershipSet,
        scope: Option<&ScopeToken>,
    ) -> ClientResult<Vec<MembershipRecord>> {
        if scope.is_some_and(|s| !s.is_active()) {
            return Err(ClientError::Cancelled);
        }

        let ticket = {
            let mut state = self.shared.state.write().await;
            state.next_ticket += 1;
            let ticket = state.next_ticket;
            state.sets.entry(set).or_default().in_flight = Some(ticket);
            ticket
        };
        tracing::debug!("[Membership] Refreshing {} (ticket {})", set, ticket);

        let fetched = self.shared.remote.list(set).await;
        let dedupe = self.policy(set) == DuplicatePolicy::Reject;

        let mut state = self.shared.state.write().await;
        let CacheState { sets, pending, .. } = &mut *state;
        let entry = sets.entry(set).or_default();

        if entry.in_flight != Some(ticket) {
            tracing::debug!("[Membership] Discarding superseded refresh of {} (ticket {})", set, ticket);
            return Err(ClientError::Cancelled);
        }
        entry.in_flight = None;

        let applied = if scope.is_some_and(|s| !s.is_active()) {
            tracing::debug!("[Membership] Discarding refresh of {}: view closed", set);
            Err(ClientError::Cancelled)
        } else {
            fetched.map(|mut records| {
                if dedupe {
                    let mut seen = HashSet::new();
                    records.retain(|r| seen.insert(r.card_id));
                }
                for mutation in pending.replay_for(set, ticket) {
                    mutation.replay(&mut records);
                }
                entry.records = records.clone();
                entry.loaded = true;
                records
            })
        };
        pending.prune_committed(set, None);
        drop(state);

        let records = applied.inspect_err(|e| {
            if !matches!(e, ClientError::Cancelled) {
                tracing::warn!("[Membership] Refresh of {} failed: {}", set, e);
            }
        })?;

        tracing::info!("[Membership] {} refreshed with {} records", set, records.len());
        self.emit(MembershipEvent::new(
            set,
            MembershipChangeKind::Refreshed {
                count: records.len(),
            },
        ));
        Ok(records)
    }

    // ---- mutations ----

    /// Add a card, optimistically.
    ///
    /// Under [`DuplicatePolicy::Reject`] the card is checked against the
    /// cache and a fresh server list first, failing with
    /// [`ClientError::AlreadyMember`] if present in either.
    pub async fn add(&self, set: MembershipSet, card_id: CardId) -> ClientResult<MembershipRecord> {
        let _guard = self.shared.locks.lock((set, card_id)).await;
        self.shared.remote.api().session().require().await?;

        if self.policy(set) == DuplicatePolicy::Reject {
            self.ensure_absent(set, card_id).await?;
        }

        let (op, inserted) = {
            let mut state = self.shared.state.write().await;
            let CacheState { sets, pending, .. } = &mut *state;
            let entry = sets.entry(set).or_default();
            let inserted = !entry.contains(card_id);
            if inserted {
                entry.records.push(MembershipRecord::new(set, card_id, None));
            }
            (pending.begin(set, card_id, PendingKind::Add { inserted }), inserted)
        };
        if inserted {
            self.emit(MembershipEvent::new(set, MembershipChangeKind::Added { card_id }));
        }

        if let Err(e) = self.shared.remote.add(set, card_id).await {
            self.roll_back(set, card_id, op, &e).await;
            return Err(e);
        }
        self.confirm(set, card_id, op).await;

        let membership_id = match set {
            MembershipSet::Collection => self.resolve_new_entry(set, card_id).await,
            MembershipSet::Wishlist => None,
        };
        tracing::info!("[Membership] Added card {} to {}", card_id, set);
        Ok(MembershipRecord::new(set, card_id, membership_id))
    }

    /// Remove a card (or a membership entry), optimistically
    pub async fn remove(
        &self,
        set: MembershipSet,
        target: impl Into<MembershipTarget>,
    ) -> ClientResult<()> {
        let target = target.into();
        self.shared.remote.api().session().require().await?;

        let card_id = self.resolve_card(set, target).await?;
        let _guard = self.shared.locks.lock((set, card_id)).await;

        let entry_id = match set {
            MembershipSet::Collection => Some(self.resolve_entry(set, card_id, target).await?),
            MembershipSet::Wishlist => None,
        };

        let op = {
            let mut state = self.shared.state.write().await;
            let CacheState { sets, pending, .. } = &mut *state;
            let removed = sets.entry(set).or_default().take_card(card_id);
            pending.begin(set, card_id, PendingKind::Remove { removed })
        };
        self.emit(MembershipEvent::new(set, MembershipChangeKind::Removed { card_id }));

        let result = match entry_id {
            Some(entry_id) => self.shared.remote.remove_from_collection(entry_id).await,
            None => self.shared.remote.remove_from_wishlist(card_id).await,
        };
        if let Err(e) = result {
            self.roll_back(set, card_id, op, &e).await;
            return Err(e);
        }
        self.confirm(set, card_id, op).await;
        tracing::info!("[Membership] Removed card {} from {}", card_id, set);
        Ok(())
    }

    /// Add when not a member, remove when a member
    pub async fn toggle(&self, set: MembershipSet, card_id: CardId) -> ClientResult<MembershipChange> {
        if self.contains(set, card_id).await {
            self.remove(set, card_id).await?;
            Ok(MembershipChange {
                set,
                card_id,
                member: false,
                record: None,
            })
        } else {
            let record = self.add(set, card_id).await?;
            Ok(MembershipChange {
                set,
                card_id,
                member: true,
                record: Some(record),
            })
        }
    }

    /// Drop all cached state (logout)
    pub async fn reset(&self) {
        {
            let mut state = self.shared.state.write().await;
            state.sets.clear();
            state.pending.clear();
        }
        tracing::debug!("[Membership] Cache reset");
        self.emit(MembershipEvent::reset());
    }

    // ---- helpers ----

    async fn ensure_absent(&self, set: MembershipSet, card_id: CardId) -> ClientResult<()> {
        let already = Err(ClientError::AlreadyMember { set, card_id });
        if self.contains(set, card_id).await {
            return already;
        }

        let loaded = {
            let state = self.shared.state.read().await;
            state.sets.get(&set).is_some_and(|s| s.loaded)
        };
        if !loaded {
            // First look at this set: load it whole
            match self.refresh(set).await {
                Ok(records) if records.iter().any(|r| r.card_id == card_id) => return already,
                Ok(_) => return Ok(()),
                Err(ClientError::Cancelled) => {}
                Err(e) => return Err(e),
            }
        }

        let remote = self.shared.remote.list(set).await?;
        if let Some(found) = remote.into_iter().find(|r| r.card_id == card_id) {
            // Adopt the server's record so the next lookup is local
            let mut state = self.shared.state.write().await;
            let entry = state.sets.entry(set).or_default();
            if entry.loaded && !entry.contains(card_id) {
                entry.records.push(found);
            }
            return already;
        }
        Ok(())
    }

    async fn confirm(&self, set: MembershipSet, card_id: CardId, op: Uuid) {
        let committed = {
            let mut state = self.shared.state.write().await;
            let stamp = state.next_ticket;
            let in_flight = state.sets.get(&set).and_then(|s| s.in_flight);
            let committed = state.pending.commit(&op, stamp);
            state.pending.prune_committed(set, in_flight);
            committed
        };
        if committed.is_some() {
            self.emit(MembershipEvent::new(set, MembershipChangeKind::Confirmed { card_id }));
        }
    }

    async fn roll_back(&self, set: MembershipSet, card_id: CardId, op: Uuid, cause: &ClientError) {
        tracing::warn!("[Membership] Reverting {} change for card {}: {}", set, card_id, cause);
        let reverted = {
            let mut state = self.shared.state.write().await;
            let CacheState { sets, pending, .. } = &mut *state;
            match pending.rollback(&op) {
                Some(mutation) => {
                    mutation.revert(&mut sets.entry(set).or_default().records);
                    true
                }
                // Reset while in flight; nothing left to revert
                None => false,
            }
        };
        if reverted {
            self.emit(MembershipEvent::new(set, MembershipChangeKind::RolledBack { card_id }));
        }
    }

    /// Look up the entry id the server gave a freshly added card.
    /// Best-effort: failures are logged and yield `None`.
    async fn resolve_new_entry(&self, set: MembershipSet, card_id: CardId) -> Option<MembershipId> {
        let records = match self.shared.remote.list(set).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("[Membership] Could not resolve entry id of card {} in {}: {}", card_id, set, e);
                return None;
            }
        };
        let entry_id = records
            .iter()
            .rev()
            .find(|r| r.card_id == card_id)
            .and_then(|r| r.membership_id)?;

        let mut state = self.shared.state.write().await;
        if let Some(record) = state
            .sets
            .entry(set)
            .or_default()
            .records
            .iter_mut()
            .find(|r| r.card_id == card_id && r.membership_id.is_none())
        {
            record.membership_id = Some(entry_id);
        }
        Some(entry_id)
    }

    async fn resolve_card(&self, set: MembershipSet, target: MembershipTarget) -> ClientResult<CardId> {
        let entry_id = match target {
            MembershipTarget::Card(card_id) => return Ok(card_id),
            MembershipTarget::Entry(entry_id) => entry_id,
        };

        let local = {
            let state = self.shared.state.read().await;
            state.sets.get(&set).and_then(|s| {
                s.records
                    .iter()
                    .find(|r| r.membership_id == Some(entry_id))
                    .map(|r| r.card_id)
            })
        };
        if let Some(card_id) = local {
            return Ok(card_id);
        }

        self.shared
            .remote
            .list(set)
            .await?
            .into_iter()
            .find(|r| r.membership_id == Some(entry_id))
            .map(|r| r.card_id)
            .ok_or_else(|| ClientError::not_found(entry_resource(set), entry_id))
    }

    /// Server-side entry id to remove. Falls back to the server list when
    /// the cache does not know it.
    async fn resolve_entry(
        &self,
        set: MembershipSet,
        card_id: CardId,
        target: MembershipTarget,
    ) -> ClientResult<MembershipId> {
        if let MembershipTarget::Entry(entry_id) = target {
            return Ok(entry_id);
        }

        let local = {
            let state = self.shared.state.read().await;
            state.sets.get(&set).and_then(|s| {
                s.records
                    .iter()
                    .find(|r| r.card_id == card_id)
                    .and_then(|r| r.membership_id)
            })
        };
        if let Some(entry_id) = local {
            return Ok(entry_id);
        }

        tracing::debug!("[Membership] Entry id of card {} unknown, asking server", card_id);
        self.shared
            .remote
            .list(set)
            .await?
            .into_iter()
            .find(|r| r.card_id == card_id)
            .and_then(|r| r.membership_id)
            .ok_or_else(|| ClientError::not_found(entry_resource(set), card_id))
    }
}

fn entry_resource(set: MembershipSet) -> &'static str {
    match set {
        MembershipSet::Wishlist => "wishlist entry",
        MembershipSet::Collection => "collection entry",
    }
}
