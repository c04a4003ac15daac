use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::CacheEntry;

/// An opaque identifier for a fetchable resource.
///
/// In practice this is the fully expanded config URL of a call tracking
/// vendor. The key must be non-empty; beyond that its contents are not
/// interpreted.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    key: Arc<str>,
}

impl CacheKey {
    /// Creates a new cache key.
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        let key = key.into();
        debug_assert!(!key.is_empty(), "cache keys must be non-empty");
        Self { key }
    }

    /// Returns the string representation of this key.
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

// Inner `Shared` future so all requesters of a key can await the same
// computation, whether it is still in flight or already resolved.
type ComputationChannel<T> = Shared<BoxFuture<'static, CacheEntry<T>>>;

type ComputationMap<T> = Arc<Mutex<HashMap<CacheKey, ComputationChannel<T>>>>;

/// A single-flight cache for asynchronous fetches.
///
/// Every key is fetched at most once for the lifetime of the cache:
/// concurrent requests for a key that is still being fetched join the
/// in-flight computation, and requests arriving after it resolved receive the
/// recorded outcome, including recorded failures. Entries are only ever
/// discarded wholesale via [`clear`](Self::clear); there is no per-entry
/// eviction or expiry.
///
/// The cache is an explicit instance rather than process-global state, so the
/// owning service controls its lifetime and shares it by handle.
pub struct Cacher<T> {
    /// Used for deduplicating fetches, and for holding their outcomes.
    current_computations: ComputationMap<T>,
}

impl<T> Clone for Cacher<T> {
    fn clone(&self) -> Self {
        Cacher {
            current_computations: Arc::clone(&self.current_computations),
        }
    }
}

impl<T> Default for Cacher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Cacher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self
            .current_computations
            .try_lock()
            .map(|c| c.len())
            .unwrap_or_default();
        f.debug_struct("Cacher").field("entries", &entries).finish()
    }
}

impl<T> Cacher<T> {
    /// Creates a new, empty cache.
    pub fn new() -> Self {
        Cacher {
            current_computations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Discards all entries.
    ///
    /// Subsequent [`get_or_fetch`](Self::get_or_fetch) calls behave as if the
    /// cache were new; fetches that are still in flight keep running for the
    /// requesters already attached to them, but are no longer joinable.
    pub fn clear(&self) {
        let mut computations = self.current_computations.lock().unwrap();
        tracing::debug!(entries = computations.len(), "Clearing response cache");
        computations.clear();
    }
}

impl<T: Clone + Send + Sync + 'static> Cacher<T> {
    /// Returns the entry for `key`, fetching it if necessary.
    ///
    /// If an entry for `key` already exists, pending or resolved, a handle to
    /// that same entry is returned and `fetch_fn` is not invoked. Otherwise
    /// `fetch_fn` is invoked exactly once and the pending entry is registered
    /// under `key` before this function first suspends, so requests racing
    /// during the in-flight window join the existing fetch instead of
    /// starting another.
    ///
    /// # Errors
    ///
    /// If the underlying fetch fails, the failure is recorded as the entry's
    /// outcome and redelivered verbatim to every requester of `key` until the
    /// cache is [`clear`](Self::clear)ed. Failed entries are not retried.
    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, fetch_fn: F) -> CacheEntry<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheEntry<T>> + Send + 'static,
    {
        // The check-and-register step must happen atomically under the map
        // lock, otherwise two callers could both see "no entry" and fetch
        // twice. The lock is released before the first await point.
        let channel = {
            let mut computations = self.current_computations.lock().unwrap();
            match computations.get(&key) {
                Some(channel) => {
                    tracing::trace!(%key, "Joining existing cache entry");
                    channel.clone()
                }
                None => {
                    tracing::trace!(%key, "Starting fetch for new cache entry");
                    let channel = fetch_fn().boxed().shared();
                    computations.insert(key, channel.clone());
                    channel
                }
            }
        };

        channel.await
    }
}
