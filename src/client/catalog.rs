//! Remote Catalog Client
//!
//! Read-only access to catalog sets and cards. Nothing here is cached: every
//! call goes to the network.

use crate::client::fetch_pool::fetch_deduplicated;
use crate::client::http::{ApiClient, Auth};
use crate::shared::catalog::{normalize_cards, Card, CardId, CardSet, SetId};
use crate::shared::error::{ClientError, ClientResult};

/// Catalog API client
#[derive(Debug, Clone)]
pub struct CatalogClient {
    api: ApiClient,
}

impl CatalogClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// All catalog sets
    pub async fn list_sets(&self) -> ClientResult<Vec<CardSet>> {
        let sets: Vec<CardSet> = self.api.get_json("/api/sets", Auth::Public).await?;
        tracing::debug!("[Catalog] Loaded {} sets", sets.len());
        Ok(sets)
    }

    /// One catalog set, looked up in the set listing
    pub async fn get_set(&self, id: SetId) -> ClientResult<CardSet> {
        self.list_sets()
            .await?
            .into_iter()
            .find(|set| set.id == id)
            .ok_or_else(|| ClientError::not_found("set", id))
    }

    /// Cards of a set, normalized from either accepted payload shape
    pub async fn get_set_cards(&self, set_id: SetId) -> ClientResult<Vec<Card>> {
        let path = format!("/api/sets/{}/cards", set_id);
        let value = self
            .api
            .get_value(&path, Auth::Public)
            .await
            .map_err(|e| not_found_as(e, "set", set_id))?;
        let cards = normalize_cards(value).map_err(|e| {
            tracing::warn!("[Catalog] Unexpected payload for set {}: {}", set_id, e);
            e
        })?;
        tracing::debug!("[Catalog] Set {} has {} cards", set_id, cards.len());
        Ok(cards)
    }

    pub async fn get_card(&self, id: CardId) -> ClientResult<Card> {
        let path = format!("/api/cards/{}", id);
        self.api
            .get_json(&path, Auth::Public)
            .await
            .map_err(|e| not_found_as(e, "card", id))
    }

    /// Fetch card details for many ids with bounded concurrency.
    ///
    /// Duplicate ids are fetched once; results follow first-seen order.
    pub async fn get_cards(
        &self,
        ids: impl IntoIterator<Item = CardId>,
    ) -> Vec<(CardId, ClientResult<Card>)> {
        let width = self.api.config().app().max_concurrent_requests;
        fetch_deduplicated(ids, width, |id| self.get_card(id)).await
    }
}

fn not_found_as(err: ClientError, resource: &'static str, id: impl ToString) -> ClientError {
    match err {
        ClientError::Remote { status: 404, .. } => ClientError::not_found(resource, id),
        other => other,
    }
}
