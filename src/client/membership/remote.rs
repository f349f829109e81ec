//! Membership endpoints of the remote API.

use crate::client::http::{ApiClient, Auth};
use crate::shared::catalog::{CardId, MembershipEntry, MembershipId, MembershipRecord, MembershipSet};
use crate::shared::error::ClientResult;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct CardIdBody {
    card_id: CardId,
}

#[derive(Debug, Serialize)]
struct EntryIdBody {
    id: MembershipId,
}

/// Wishlist and collection API client. Every call needs the credential.
#[derive(Debug, Clone)]
pub struct MembershipApi {
    api: ApiClient,
}

impl MembershipApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Full membership list of a set, in server order
    pub async fn list(&self, set: MembershipSet) -> ClientResult<Vec<MembershipRecord>> {
        let path = format!("/api/{}", set);
        let entries: Vec<MembershipEntry> = self.api.get_json(&path, Auth::Bearer).await?;
        Ok(entries.into_iter().map(|e| e.into_record(set)).collect())
    }

    pub async fn add(&self, set: MembershipSet, card_id: CardId) -> ClientResult<()> {
        let path = format!("/api/{}/add", set);
        self.api
            .post(&path, Some(&CardIdBody { card_id }), Auth::Bearer)
            .await?;
        Ok(())
    }

    /// Wishlist entries are removed by card id
    pub async fn remove_from_wishlist(&self, card_id: CardId) -> ClientResult<()> {
        self.api
            .post("/api/wishlist/remove", Some(&CardIdBody { card_id }), Auth::Bearer)
            .await?;
        Ok(())
    }

    /// Collection entries are removed by their own entry id
    pub async fn remove_from_collection(&self, entry_id: MembershipId) -> ClientResult<()> {
        self.api
            .post("/api/collection/remove", Some(&EntryIdBody { id: entry_id }), Auth::Bearer)
            .await?;
        Ok(())
    }
}
