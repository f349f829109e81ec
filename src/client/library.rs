//! Library views
//!
//! Assembles what the card screens display: membership lists joined with
//! card details, the searchable card list of a set, and the profile summary.
//! Card details are fetched through the catalog's bounded batch fetch.

use crate::client::auth::AccountApi;
use crate::client::catalog::CatalogClient;
use crate::client::membership::{MembershipCache, SetPhase};
use crate::client::types::{CardQuery, CollectionCard, ProfileSummary, WishlistFilter};
use crate::shared::catalog::{Card, CardId, MembershipSet, SetId};
use crate::shared::error::{ClientError, ClientResult};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// A card of the set list with its wishlist flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedCard {
    pub card: Card,
    pub in_wishlist: bool,
}

#[derive(Debug, Clone)]
pub struct Library {
    catalog: CatalogClient,
    cache: MembershipCache,
    account: AccountApi,
}

impl Library {
    pub fn new(catalog: CatalogClient, cache: MembershipCache, account: AccountApi) -> Self {
        Self {
            catalog,
            cache,
            account,
        }
    }

    /// Wishlisted cards with details. Cards that fail to load are skipped.
    pub async fn wishlist_cards(&self) -> ClientResult<Vec<Card>> {
        let records = self.cache.refresh(MembershipSet::Wishlist).await?;
        let fetched = self
            .catalog
            .get_cards(records.iter().map(|r| r.card_id))
            .await;

        let cards = fetched
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(card) => Some(card),
                Err(e) => {
                    tracing::warn!("[Library] Skipping wishlist card {}: {}", id, e);
                    None
                }
            })
            .collect();
        Ok(cards)
    }

    /// Collection entries with details. An entry whose card fails to load is
    /// kept with its ids only.
    pub async fn collection_cards(&self) -> ClientResult<Vec<CollectionCard>> {
        let records = self.cache.refresh(MembershipSet::Collection).await?;
        let mut details: HashMap<CardId, Card> = HashMap::new();
        for (id, result) in self
            .catalog
            .get_cards(records.iter().map(|r| r.card_id))
            .await
        {
            match result {
                Ok(card) => {
                    details.insert(id, card);
                }
                Err(e) => tracing::warn!("[Library] No details for collection card {}: {}", id, e),
            }
        }

        Ok(records
            .into_iter()
            .map(|record| CollectionCard {
                card_id: record.card_id,
                collection_id: record.membership_id,
                card: details.get(&record.card_id).cloned(),
            })
            .collect())
    }

    /// Cards of a catalog set, searched, filtered and sorted.
    ///
    /// Wishlist flags come from the membership cache; without a credential
    /// every card counts as not wishlisted.
    pub async fn set_cards(&self, set_id: SetId, query: &CardQuery) -> ClientResult<Vec<ListedCard>> {
        let cards = self.catalog.get_set_cards(set_id).await?;
        let wishlist = self.wishlist_ids().await?;

        let listed = cards
            .into_iter()
            .map(|card| ListedCard {
                in_wishlist: wishlist.contains(&card.id),
                card,
            })
            .collect();
        Ok(apply_query(listed, query))
    }

    /// Email plus the size of both membership sets
    pub async fn profile_summary(&self) -> ClientResult<ProfileSummary> {
        let (me, wishlist, collection) = tokio::join!(
            self.account.me(),
            self.cache.refresh(MembershipSet::Wishlist),
            self.cache.refresh(MembershipSet::Collection),
        );
        let profile = me?;

        Ok(ProfileSummary {
            email: profile.email,
            wishlist_count: count_or_zero(MembershipSet::Wishlist, wishlist),
            collection_count: count_or_zero(MembershipSet::Collection, collection),
        })
    }

    async fn wishlist_ids(&self) -> ClientResult<HashSet<CardId>> {
        if self.cache.phase(MembershipSet::Wishlist).await != SetPhase::Ready {
            match self.cache.refresh(MembershipSet::Wishlist).await {
                Ok(_) | Err(ClientError::Unauthenticated) | Err(ClientError::Cancelled) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(self
            .cache
            .records(MembershipSet::Wishlist)
            .await
            .into_iter()
            .map(|r| r.card_id)
            .collect())
    }
}

fn count_or_zero<T>(set: MembershipSet, result: ClientResult<Vec<T>>) -> usize {
    match result {
        Ok(records) => records.len(),
        Err(e) => {
            tracing::warn!("[Library] Could not count {}: {}", set, e);
            0
        }
    }
}

/// Apply search, wishlist filter and sort to a card list
pub fn apply_query(cards: Vec<ListedCard>, query: &CardQuery) -> Vec<ListedCard> {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut cards: Vec<ListedCard> = cards
        .into_iter()
        .filter(|c| match &needle {
            Some(needle) => c.card.name.to_lowercase().contains(needle),
            None => true,
        })
        .filter(|c| match query.wishlist {
            WishlistFilter::All => true,
            WishlistFilter::InWishlist => c.in_wishlist,
            WishlistFilter::NotInWishlist => !c.in_wishlist,
        })
        .collect();

    if query.sort_by_name {
        cards.sort_by_cached_key(|c| c.card.name.to_lowercase());
    }
    cards
}
