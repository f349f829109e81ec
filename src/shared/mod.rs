//! Shared Module
//!
//! Types used by every layer of the client: catalog and membership data,
//! the error taxonomy, configuration and membership change events.
//!
//! Nothing in here performs I/O except configuration file loading.

/// Catalog and membership data types
pub mod catalog;

/// Client error types
pub mod error;

/// Membership change events
pub mod event;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use catalog::{
    Card, CardId, CardSet, MembershipId, MembershipRecord, MembershipSet, SetId, UserId,
};
pub use config::{AppConfig, AppConfigBuilder, ConfigError, DuplicatePolicy, StoreLocation};
pub use error::{ClientError, ClientResult};
pub use event::{MembershipChangeKind, MembershipEvent};
