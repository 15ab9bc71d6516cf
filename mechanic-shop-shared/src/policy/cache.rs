/// Read-through response cache
///
/// Stores serialized response bodies for a fixed time-to-live. A miss runs
/// the loader once even if many requests miss at the same moment (moka
/// coalesces concurrent initialisations of the same key); the others wait
/// and receive the same bytes. Entries are never invalidated by writes,
/// so a read within the TTL may be stale.

use crate::error::{ShopError, ShopResult};
use bytes::Bytes;
use moka::future::Cache;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// TTL used when none is configured
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct ResponseCache {
    entries: Cache<String, Bytes>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        let entries = Cache::builder().max_capacity(64).time_to_live(ttl).build();
        Self { entries, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached body for `key`, or runs `load` and caches its result
    ///
    /// Errors are passed through and not cached.
    pub async fn get_or_load<F>(&self, key: &str, load: F) -> ShopResult<Bytes>
    where
        F: Future<Output = ShopResult<Bytes>>,
    {
        if let Some(hit) = self.entries.get(key).await {
            debug!(key, "response cache hit");
            return Ok(hit);
        }

        self.entries
            .try_get_with(key.to_string(), load)
            .await
            .map_err(|e| ShopError::clone(&e))
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
