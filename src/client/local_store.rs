//! # Local Key-Value Store
//!
//! Durable storage for the little state the client keeps between runs: the
//! session credential under [`USER_TOKEN_KEY`]. Backed by a single SQLite
//! table so other small settings can join it later without a new file.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cardkeep::client::local_store::{LocalStore, USER_TOKEN_KEY};
//! use cardkeep::shared::StoreLocation;
//!
//! # async fn example() -> cardkeep::shared::ClientResult<()> {
//! let store = LocalStore::open(&StoreLocation::InMemory).await?;
//! store.set(USER_TOKEN_KEY, "abc123").await?;
//! assert_eq!(store.get(USER_TOKEN_KEY).await?.as_deref(), Some("abc123"));
//! # Ok(())
//! # }
//! ```

use crate::shared::config::StoreLocation;
use crate::shared::error::{ClientError, ClientResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Key under which the bearer credential is persisted
pub const USER_TOKEN_KEY: &str = "userToken";

/// SQLite-backed key-value store
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open or create the store
    ///
    /// File stores use WAL mode. The in-memory store pins a single
    /// connection, since every SQLite connection to `:memory:` sees its own
    /// database.
    pub async fn open(location: &StoreLocation) -> ClientResult<Self> {
        let pool = match location {
            StoreLocation::InMemory => {
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect("sqlite::memory:")
                    .await?
            }
            StoreLocation::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ClientError::storage(format!("cannot create {}: {}", parent.display(), e))
                    })?;
                }
                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal);
                SqlitePoolOptions::new()
                    .max_connections(2)
                    .connect_with(options)
                    .await?
            }
        };

        let store = Self { pool };
        store.init_schema().await?;
        tracing::debug!("[Store] Opened local store at {:?}", location);
        Ok(store)
    }

    async fn init_schema(&self) -> ClientResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    /// Insert or overwrite a value
    pub async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a key. Returns whether it existed.
    pub async fn remove(&self, key: &str) -> ClientResult<bool> {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
