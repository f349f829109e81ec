//! Per-key async locks.
//!
//! Mutations on the same `(set, card)` pair run one at a time; mutations on
//! different pairs proceed in parallel.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Guard released when dropped
pub type KeyGuard = OwnedMutexGuard<()>;

#[derive(Debug)]
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn lock(&self, key: K) -> KeyGuard {
        let slot = {
            let mut locks = self.locks.lock().await;
            // Drop entries nobody holds or waits on
            locks.retain(|_, slot| Arc::strong_count(slot) > 1);
            locks.entry(key).or_default().clone()
        };
        slot.lock_owned().await
    }

    /// Number of keys currently held or awaited
    pub async fn active_keys(&self) -> usize {
        let locks = self.locks.lock().await;
        locks.values().filter(|slot| Arc::strong_count(slot) > 1).count()
    }
}
