//! Catalog Client Module
//!
//! Async client for the card catalog server: account, catalog, wishlist and
//! collection, plus the optimistic membership cache every view shares.
//!
//! # Architecture
//!
//! - **`config`** - Configuration wrapper (server URL, endpoint URLs)
//! - **`local_store`** - SQLite key-value store holding the credential
//! - **`session`** - Explicit session context carrying the bearer token
//! - **`http`** - `reqwest` transport with bearer injection and status mapping
//! - **`retry`** - Backoff policy for transport failures
//! - **`fetch_pool`** - Bounded, de-duplicated batch fetching
//! - **`auth`** - Login, registration, logout, current user
//! - **`catalog`** - Read-only catalog sets and cards
//! - **`membership`** - Wishlist/collection API and the membership cache
//! - **`library`** - Assembled views (membership lists with details, set card list, profile)
//! - **`types`** - Account request/response bodies and view records
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs          - Module exports and the CardClient facade
//! ├── config.rs       - Configuration wrapper
//! ├── local_store.rs  - SQLite key-value store
//! ├── session.rs      - Session context
//! ├── http.rs         - HTTP transport
//! ├── retry.rs        - Retry policy
//! ├── fetch_pool.rs   - Bounded batch fetch
//! ├── auth.rs         - Account API
//! ├── catalog.rs      - Catalog API
//! ├── library.rs      - Library views
//! ├── types.rs        - Account and view types
//! └── membership/     - Membership API, cache, ledger, locks, scopes
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use cardkeep::client::{CardClient, Config};
//! use cardkeep::shared::{CardId, MembershipSet};
//!
//! # async fn example() -> cardkeep::shared::ClientResult<()> {
//! let client = CardClient::connect(Config::load(None)?).await?;
//! client.account().login("ash@example.com", "pikachu").await?;
//! client.membership().add(MembershipSet::Wishlist, CardId(42)).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod catalog;
pub mod config;
pub mod fetch_pool;
pub mod http;
pub mod library;
pub mod local_store;
pub mod membership;
pub mod retry;
pub mod session;
pub mod types;

pub use auth::AccountApi;
pub use catalog::CatalogClient;
pub use config::Config;
pub use http::{ApiClient, Auth};
pub use library::{Library, ListedCard};
pub use local_store::LocalStore;
pub use membership::{MembershipCache, MembershipChange, MembershipTarget, SetPhase, ViewScope};
pub use session::Session;
pub use types::{CardQuery, CollectionCard, ProfileSummary, UserProfile, WishlistFilter};

use crate::shared::error::ClientResult;
use membership::MembershipApi;
use retry::RetryPolicy;

/// Everything wired together around one session
#[derive(Debug, Clone)]
pub struct CardClient {
    session: Session,
    catalog: CatalogClient,
    membership: MembershipCache,
    account: AccountApi,
    library: Library,
}

impl CardClient {
    /// Open the local store, restore a persisted credential and build every
    /// API component on top of it
    pub async fn connect(config: Config) -> ClientResult<Self> {
        let store = LocalStore::open(&config.app().store).await?;
        let session = Session::with_store(store);
        if session.restore().await? {
            tracing::info!("[Auth] Resuming previous session");
        }
        Self::with_session(config, session)
    }

    /// Build on an existing session (tests, embedders with their own store)
    pub fn with_session(config: Config, session: Session) -> ClientResult<Self> {
        let retry = RetryPolicy::from_settings(&config.app().retry);
        let api = ApiClient::new(config, session.clone())?.with_retry(retry);

        let catalog = CatalogClient::new(api.clone());
        let membership = MembershipCache::new(MembershipApi::new(api.clone()));
        let account = AccountApi::new(api, membership.clone());
        let library = Library::new(catalog.clone(), membership.clone(), account.clone());

        Ok(Self {
            session,
            catalog,
            membership,
            account,
            library,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    pub fn membership(&self) -> &MembershipCache {
        &self.membership
    }

    pub fn account(&self) -> &AccountApi {
        &self.account
    }

    pub fn library(&self) -> &Library {
        &self.library
    }
}
