/**
 * Account and View Types
 *
 * Request/response bodies of the account endpoints and the assembled
 * records the library views return.
 */

use crate::shared::catalog::{Card, CardId, MembershipId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Successful login body. `token` is optional here so a missing token can be
/// reported as a malformed response instead of a parse error.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
}

/// Current user, from `GET /api/me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<UserId>,
}

/// What the profile screen shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    pub email: String,
    pub wishlist_count: usize,
    pub collection_count: usize,
}

/// Collection entry joined with its card details.
///
/// `card` is `None` when the details could not be loaded; the entry is still
/// listed with its ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionCard {
    pub card_id: CardId,
    pub collection_id: Option<MembershipId>,
    pub card: Option<Card>,
}

/// Wishlist filter of the set card list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WishlistFilter {
    #[default]
    All,
    InWishlist,
    NotInWishlist,
}

/// Search, filter and sort options of the set card list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardQuery {
    /// Case-insensitive substring of the card name
    pub search: Option<String>,
    pub wishlist: WishlistFilter,
    /// Sort by name, ascending
    pub sort_by_name: bool,
}

impl CardQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn wishlist(mut self, filter: WishlistFilter) -> Self {
        self.wishlist = filter;
        self
    }

    pub fn sorted(mut self) -> Self {
        self.sort_by_name = true;
        self
    }
}
