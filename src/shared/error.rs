//! Client Error Types
//!
//! This module defines the single error type returned by every remote-calling
//! and cache operation in the crate.
//!
//! # Error Categories
//!
//! - `Unauthenticated` - No credential, or the server rejected it (401)
//! - `Network` - Transport failure or timeout
//! - `Remote` - Non-success HTTP status
//! - `MalformedResponse` - Payload did not match the expected shape
//! - `AlreadyMember` - Domain-level duplicate insert
//! - `NotFound` - Missing catalog entity or membership entry
//! - `Cancelled` - Result discarded because the requesting view went away
//! - `Storage` - Local key-value store failure
//! - `Config` - Invalid configuration
//!
//! # Usage
//!
//! ```rust
//! use cardkeep::shared::error::ClientError;
//!
//! let error = ClientError::remote(500, "Internal Server Error");
//! assert!(!error.is_retryable());
//! ```
use crate::shared::catalog::{CardId, MembershipSet};
use crate::shared::config::ConfigError;
use thiserror::Error;

/// Result alias used across the client
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the catalog client and the membership cache
#[derive(Debug, Error)]
pub enum ClientError {
    /// No credential is held, or the server refused it
    #[error("Not authenticated")]
    Unauthenticated,

    /// Transport-level failure (connection refused, DNS, timeout)
    #[error("Network error: {message}")]
    Network {
        /// Human-readable error message
        message: String,
    },

    /// The server answered with a non-success status
    #[error("Remote error ({status}): {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Message from the response body, or the status reason
        message: String,
    },

    /// The payload did not match any accepted shape
    #[error("Malformed response: {message}")]
    MalformedResponse {
        /// Human-readable error message
        message: String,
    },

    /// The card already has an active record in this membership set
    #[error("Card {card_id} is already in the {set}")]
    AlreadyMember {
        /// Membership set the insert targeted
        set: MembershipSet,
        /// Card that is already a member
        card_id: CardId,
    },

    /// A catalog entity or membership entry does not exist
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of resource ("card", "set", "collection entry")
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The requesting view went away before the result arrived
    #[error("Request cancelled: the requesting view is no longer active")]
    Cancelled,

    /// Local key-value store failure
    #[error("Storage error: {message}")]
    Storage {
        /// Human-readable error message
        message: String,
    },

    /// Configuration could not be built
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Create a new network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new remote error
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Create a new malformed-response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Only transport failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Whether the caller should send the user back to the login flow
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }

    /// Generic text for a user-facing notification
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Please log in to continue.".to_string(),
            Self::Network { .. } => {
                "Unable to reach the server. Please try again later.".to_string()
            }
            Self::AlreadyMember { set, .. } => format!("This card is already in your {}.", set),
            Self::NotFound { resource, .. } => format!("The requested {} does not exist.", resource),
            Self::Cancelled => String::new(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::malformed(err.to_string())
        } else if let Some(status) = err.status() {
            Self::remote(status.as_u16(), err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(format!("JSON error: {}", err))
    }
}

impl From<sqlx::Error> for ClientError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(err.to_string())
    }
}
