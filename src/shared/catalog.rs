//! Catalog and Membership Types
//!
//! Wire and domain types for catalog sets, cards and the two membership sets
//! (wishlist, collection). These are shared by the HTTP clients, the
//! membership cache and the CLI.
//!
//! Identifiers arrive from the server either as JSON numbers or as numeric
//! strings; both deserialize into the same newtype.

use crate::shared::error::ClientError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(#[serde(deserialize_with = "deserialize_id")] pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a catalog card
    CardId
);
numeric_id!(
    /// Identifier of a catalog set (a series of cards)
    SetId
);
numeric_id!(
    /// Identifier of a membership entry, distinct from the card id
    MembershipId
);
numeric_id!(
    /// Identifier of a user account
    UserId
);

/// A catalog set (a series of cards)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSet {
    pub id: SetId,
    pub name: String,
}

/// A catalog card. Owned by the remote catalog and never mutated client-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Version line shown under the name
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtitle: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Image URL
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
    #[serde(default)]
    pub rarity: Option<String>,
    /// Standard print counter
    #[serde(default, deserialize_with = "null_as_default")]
    pub standard: u32,
    /// Holographic ("brillante") print counter
    #[serde(default, deserialize_with = "null_as_default")]
    pub brillante: u32,
}

/// Accepted shapes of a card list payload
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CardsPayload {
    List(Vec<Card>),
    Wrapped { data: Vec<Card> },
}

/// Normalize a card list payload to a plain sequence.
///
/// The server answers either with a bare array or with `{"data": [...]}`.
/// Anything else is a `MalformedResponse`.
pub fn normalize_cards(value: serde_json::Value) -> Result<Vec<Card>, ClientError> {
    match serde_json::from_value::<CardsPayload>(value) {
        Ok(CardsPayload::List(cards)) | Ok(CardsPayload::Wrapped { data: cards }) => Ok(cards),
        Err(err) => Err(ClientError::malformed(format!(
            "expected a card array or {{\"data\": [...]}}: {}",
            err
        ))),
    }
}

/// The two named collections a user maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipSet {
    Wishlist,
    Collection,
}

impl MembershipSet {
    pub const ALL: [MembershipSet; 2] = [MembershipSet::Wishlist, MembershipSet::Collection];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wishlist => "wishlist",
            Self::Collection => "collection",
        }
    }
}

impl fmt::Display for MembershipSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wishlist" => Ok(Self::Wishlist),
            "collection" => Ok(Self::Collection),
            other => Err(format!("unknown membership set '{}'", other)),
        }
    }
}

/// One card's presence in a membership set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub card_id: CardId,
    /// Server-side entry id; `None` while an optimistic insert is unconfirmed
    /// or when the server does not expose one.
    pub membership_id: Option<MembershipId>,
    pub set: MembershipSet,
}

impl MembershipRecord {
    pub fn new(set: MembershipSet, card_id: CardId, membership_id: Option<MembershipId>) -> Self {
        Self {
            card_id,
            membership_id,
            set,
        }
    }
}

/// Entry of `GET /api/wishlist` and `GET /api/collection`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipEntry {
    #[serde(default)]
    pub id: Option<MembershipId>,
    pub card_id: CardId,
}

impl MembershipEntry {
    pub fn into_record(self, set: MembershipSet) -> MembershipRecord {
        MembershipRecord::new(set, self.card_id, self.id)
    }
}
