//! cardkeep - Trading-Card Catalog Client
//!
//! Async Rust client for a trading-card catalog server. Users browse catalog
//! sets and cards and keep two personal lists of cards: a wishlist and a
//! collection.
//!
//! # Overview
//!
//! - Session context holding the bearer credential, persisted in SQLite
//! - Catalog access with payload normalization and bounded batch fetching
//! - Membership cache with optimistic add/remove, rollback on failure,
//!   per-key mutation serialization and change notification
//! - Layered configuration (defaults, TOML file, environment)
//!
//! # Module Structure
//!
//! - **`shared`** - Domain types, configuration, errors and events
//! - **`client`** - Session, HTTP transport, API clients, membership cache
//!
//! The `cardkeep` binary (`src/cli/main.rs`) drives the client from the
//! command line.
//!
//! # Thread Safety
//!
//! Every client component is `Clone` and shares state through
//! `Arc<RwLock<..>>`; membership changes fan out over a
//! `tokio::sync::broadcast` channel.
//!
//! # Error Handling
//!
//! All operations return [`shared::ClientResult`]; see
//! [`shared::ClientError`] for the taxonomy.

/// Shared types and data structures
pub mod shared;

/// Async catalog client
pub mod client;
