//! Bounded, de-duplicated batch fetching.
//!
//! Screens that show many cards need one detail request per card. Instead of
//! firing them all at once, requests go through a window of at most `width`
//! in-flight futures, and each distinct key is fetched only once.

use crate::shared::error::ClientResult;
use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;

/// Fetch every distinct key with at most `width` requests in flight.
///
/// Results come back in first-seen key order, one per distinct key, each
/// carrying its own success or failure.
pub async fn fetch_deduplicated<K, V, F, Fut>(
    keys: impl IntoIterator<Item = K>,
    width: usize,
    fetch: F,
) -> Vec<(K, ClientResult<V>)>
where
    K: Copy + Eq + Hash,
    F: Fn(K) -> Fut,
    Fut: Future<Output = ClientResult<V>>,
{
    let mut seen = HashSet::new();
    let unique: Vec<K> = keys.into_iter().filter(|k| seen.insert(*k)).collect();

    stream::iter(unique)
        .map(|key| {
            let pending = fetch(key);
            async move { (key, pending.await) }
        })
        .buffered(width.max(1))
        .collect()
        .await
}
