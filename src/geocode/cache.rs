//! Per-run memo of provider lookups.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use super::ProviderHit;
use crate::models::MatchedProvider;

type CacheKey = (MatchedProvider, String);

/// Normalize query text for cache keys: trimmed, single-spaced, lowercase
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Memoizes lookups by provider and normalized query.
///
/// Concurrent lookups for the same key share one in-flight call. Misses are
/// remembered too, so a query that found nothing is not sent again.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<CacheKey, Arc<OnceCell<Option<ProviderHit>>>>>,
    hits: AtomicUsize,
    lookups: AtomicUsize,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized result for `(provider, query)`, running `lookup` only
    /// if no earlier call for that key exists.
    pub async fn get_or_lookup<F, Fut>(
        &self,
        provider: MatchedProvider,
        query: &str,
        lookup: F,
    ) -> Option<ProviderHit>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<ProviderHit>>,
    {
        let key = (provider, normalize_query(query));
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(key).or_default())
        };

        let mut ran = false;
        let result = cell
            .get_or_init(|| {
                ran = true;
                lookup()
            })
            .await
            .clone();

        if ran {
            self.lookups.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit for {} query '{}'", provider, query);
        }

        result
    }

    /// Number of lookups answered from the cache
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of lookups actually sent to providers
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}
