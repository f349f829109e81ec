//! Session Context
//!
//! Holds the bearer credential of the current user. A `Session` is passed
//! explicitly to every component that calls a protected endpoint; its
//! lifecycle follows login and logout.
//!
//! When a [`LocalStore`] is attached the credential is also persisted under
//! `userToken` so the next process start can [`Session::restore`] it.

use crate::client::local_store::{LocalStore, USER_TOKEN_KEY};
use crate::shared::error::{ClientError, ClientResult};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared session handle. Clones refer to the same credential.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
    store: Option<LocalStore>,
}

impl Session {
    /// Session that lives only for this process
    pub fn new() -> Self {
        Self::default()
    }

    /// Session persisted through `store`
    pub fn with_store(store: LocalStore) -> Self {
        Self {
            token: Arc::new(RwLock::new(None)),
            store: Some(store),
        }
    }

    /// Load a persisted credential. Returns whether one was found.
    pub async fn restore(&self) -> ClientResult<bool> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let persisted = store.get(USER_TOKEN_KEY).await?;
        let found = persisted.is_some();
        *self.token.write().await = persisted;
        if found {
            tracing::debug!("[Auth] Restored persisted credential");
        }
        Ok(found)
    }

    /// Store the credential for the rest of the process lifetime
    pub async fn set_credential(&self, token: impl Into<String>) -> ClientResult<()> {
        let token = token.into();
        if let Some(store) = &self.store {
            store.set(USER_TOKEN_KEY, &token).await?;
        }
        *self.token.write().await = Some(token);
        Ok(())
    }

    pub async fn credential(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// The credential, or `Unauthenticated` before anything goes on the wire
    pub async fn require(&self) -> ClientResult<String> {
        self.credential().await.ok_or(ClientError::Unauthenticated)
    }

    /// Drop the credential from memory and from the store.
    ///
    /// Memory is cleared first so a store failure still leaves the process
    /// logged out.
    pub async fn clear(&self) -> ClientResult<()> {
        *self.token.write().await = None;
        if let Some(store) = &self.store {
            store.remove(USER_TOKEN_KEY).await?;
        }
        Ok(())
    }
}
