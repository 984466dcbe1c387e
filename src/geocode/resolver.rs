//! Multi-provider geocode resolver.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use super::{ProviderHit, QueryCache, RateLimiter, SharedProvider};
use crate::models::{GeocodeResult, MatchedProvider, ResolvedPlace, SavedPlaceRow};

pub const DEFAULT_CONCURRENCY: usize = 8;

/// A provider with the limiter guarding it
struct ProviderSlot {
    provider: SharedProvider,
    limiter: Option<Arc<RateLimiter>>,
}

/// Resolves saved-place rows to coordinates.
///
/// Rows are processed concurrently but results come back in input order. A
/// provider with a `min_interval` gets one limiter shared by every row in
/// flight, and it lives as long as the resolver so spacing holds across runs.
pub struct GeocodeResolver {
    providers: Vec<ProviderSlot>,
    concurrency: usize,
    progress: Option<ProgressBar>,
}

/// Summary of one `resolve()` run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub total: usize,
    pub embedded: usize,
    pub google: usize,
    pub nominatim: usize,
    pub arcgis: usize,
    pub unresolved: usize,
    /// Requests actually sent to providers
    pub lookups: usize,
    pub cache_hits: usize,
}

impl ResolveStats {
    fn collect(places: &[ResolvedPlace], cache: &QueryCache) -> Self {
        let mut stats = ResolveStats {
            total: places.len(),
            lookups: cache.lookups(),
            cache_hits: cache.hits(),
            ..Default::default()
        };
        for place in places {
            if place.geocode.is_embedded() {
                stats.embedded += 1;
                continue;
            }
            match place.geocode.provider() {
                MatchedProvider::Google => stats.google += 1,
                MatchedProvider::Nominatim => stats.nominatim += 1,
                MatchedProvider::ArcGis => stats.arcgis += 1,
                MatchedProvider::None => stats.unresolved += 1,
            }
        }
        stats
    }
}

impl GeocodeResolver {
    /// Create a resolver trying `providers` in the given order
    pub fn new(providers: Vec<SharedProvider>) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| {
                if !provider.is_configured() {
                    warn!(
                        "{} is not configured; it will be skipped for every row",
                        provider.kind()
                    );
                }
                let limiter = provider.min_interval().map(|interval| {
                    let limiter = RateLimiter::new(interval);
                    debug!(
                        "{} limited to one request every {:?}",
                        provider.kind(),
                        limiter.interval()
                    );
                    Arc::new(limiter)
                });
                ProviderSlot { provider, limiter }
            })
            .collect();

        Self {
            providers,
            concurrency: DEFAULT_CONCURRENCY,
            progress: None,
        }
    }

    /// Maximum number of rows in flight
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Resolve every row. Output has the same length and order as `rows`.
    pub async fn resolve(&self, rows: Vec<SavedPlaceRow>) -> Vec<ResolvedPlace> {
        self.resolve_with_stats(rows).await.0
    }

    pub async fn resolve_with_stats(
        &self,
        rows: Vec<SavedPlaceRow>,
    ) -> (Vec<ResolvedPlace>, ResolveStats) {
        info!("Geocoding {} rows...", rows.len());
        if let Some(pb) = &self.progress {
            pb.set_length(rows.len() as u64);
        }

        let cache = QueryCache::new();
        let cache = &cache;

        let places: Vec<ResolvedPlace> = stream::iter(rows.into_iter().enumerate())
            .map(|(index, row)| async move {
                let geocode = self.resolve_row(index, &row, cache).await;
                if let Some(pb) = &self.progress {
                    pb.inc(1);
                }
                ResolvedPlace { index, row, geocode }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
        let stats = ResolveStats::collect(&places, cache);
        info!(
            "Geocoded {} rows: {} embedded, {} google, {} nominatim, {} arcgis, {} unresolved ({} lookups, {} cache hits)",
            stats.total,
            stats.embedded,
            stats.google,
            stats.nominatim,
            stats.arcgis,
            stats.unresolved,
            stats.lookups,
            stats.cache_hits
        );

        (places, stats)
    }

    async fn resolve_row(
        &self,
        index: usize,
        row: &SavedPlaceRow,
        cache: &QueryCache,
    ) -> GeocodeResult {
        // Fast path: coordinates already in the source data
        if let Some(embedded) = row.coordinates {
            debug!("Row {} uses embedded coordinates", index);
            return GeocodeResult::embedded(embedded.point, embedded.source);
        }

        let Some(query) = row.query() else {
            warn!("Row {} has no location text or title; skipping", index);
            return GeocodeResult::not_found();
        };

        for slot in &self.providers {
            if !slot.provider.is_configured() {
                continue;
            }
            let kind = slot.provider.kind();
            let hit = cache
                .get_or_lookup(kind, query, || Self::lookup(slot, query))
                .await;

            if let Some(hit) = hit {
                debug!(
                    "Row {} resolved by {} as '{}'",
                    index,
                    kind,
                    hit.label.as_deref().unwrap_or(query)
                );
                return GeocodeResult::found(hit.point, kind, hit.confidence);
            }
            debug!("{} found nothing for row {}", kind, index);
        }

        info!("No provider could resolve row {} ('{}')", index, query);
        GeocodeResult::not_found()
    }

    /// One provider call. Every failure is logged and treated as not found.
    async fn lookup(slot: &ProviderSlot, query: &str) -> Option<ProviderHit> {
        if let Some(limiter) = &slot.limiter {
            limiter.acquire().await;
        }
        match slot.provider.lookup(query).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!("{} lookup failed for '{}': {}", slot.provider.kind(), query, e);
                None
            }
        }
    }
}
