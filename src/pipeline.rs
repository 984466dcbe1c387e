//! The full run: resolve, filter, enrich.
//!
//! Each stage consumes the previous stage's output and nothing is mutated
//! in place, so the report carries every intermediate sequence.

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use tracing::info;

use crate::config::Config;
use crate::enrich::Enricher;
use crate::error::ProviderError;
use crate::export::FeatureCollection;
use crate::geocode::{providers_from_config, GeocodeResolver, ResolveStats};
use crate::models::{EnrichedPlace, ResolvedPlace, SavedPlaceRow};
use crate::pip::{DrawnPolygon, FilterOutcome, SpatialFilter};

/// Everything one run produced
#[derive(Debug)]
pub struct PipelineReport {
    /// One entry per input row, in input order
    pub resolved: Vec<ResolvedPlace>,
    pub stats: ResolveStats,
    pub filter: FilterOutcome,
    /// One entry per kept place, in input order
    pub enriched: Vec<EnrichedPlace>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineReport {
    /// Rows no provider could place
    pub fn unresolved(&self) -> impl Iterator<Item = &ResolvedPlace> {
        self.resolved.iter().filter(|p| !p.geocode.is_resolved())
    }

    pub fn feature_collection(&self) -> FeatureCollection {
        FeatureCollection::from_enriched(&self.enriched)
    }
}

pub struct Pipeline {
    resolver: GeocodeResolver,
    enricher: Enricher,
}

impl Pipeline {
    pub fn new(resolver: GeocodeResolver, enricher: Enricher) -> Self {
        Self { resolver, enricher }
    }

    /// Build providers and the describer from configuration
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let resolver = GeocodeResolver::new(providers_from_config(config)?)
            .with_concurrency(config.geocode.concurrency);
        let enricher = if config.enrichment.enabled {
            Enricher::from_config(config)?
        } else {
            Enricher::disabled()
        };
        Ok(Self::new(resolver, enricher))
    }

    /// Report geocoding and enrichment progress on the given bars
    pub fn with_progress(self, geocode: ProgressBar, enrich: ProgressBar) -> Self {
        Self {
            resolver: self.resolver.with_progress(geocode),
            enricher: self.enricher.with_progress(enrich),
        }
    }

    pub async fn run(
        &self,
        rows: Vec<SavedPlaceRow>,
        polygons: &[DrawnPolygon],
    ) -> PipelineReport {
        self.execute(rows, polygons, true).await
    }

    /// Resolve and filter only; kept places get their original titles
    pub async fn run_without_enrichment(
        &self,
        rows: Vec<SavedPlaceRow>,
        polygons: &[DrawnPolygon],
    ) -> PipelineReport {
        self.execute(rows, polygons, false).await
    }

    async fn execute(
        &self,
        rows: Vec<SavedPlaceRow>,
        polygons: &[DrawnPolygon],
        enrich: bool,
    ) -> PipelineReport {
        let started_at = Utc::now();

        let (resolved, stats) = self.resolver.resolve_with_stats(rows).await;

        let filter = SpatialFilter::new(polygons).filter(&resolved);

        let enriched = if enrich && self.enricher.is_enabled() {
            self.enricher.enrich(filter.kept.clone()).await
        } else {
            filter
                .kept
                .iter()
                .cloned()
                .map(EnrichedPlace::fallback)
                .collect()
        };

        let finished_at = Utc::now();
        info!(
            "Run finished in {}ms: {} rows, {} kept, {} outside, {} unresolved",
            (finished_at - started_at).num_milliseconds(),
            resolved.len(),
            filter.kept.len(),
            filter.outside,
            filter.skipped_unresolved.len()
        );

        PipelineReport {
            resolved,
            stats,
            filter,
            enriched,
            started_at,
            finished_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{DescriptionRequest, PlaceDescriber, PlaceDescription};
    use crate::geocode::{GeocodeProvider, ProviderHit, SharedProvider};
    use crate::models::{EnrichmentStatus, GeoPoint, MatchedProvider};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<(MatchedProvider, String)>>>;

    struct TableProvider {
        kind: MatchedProvider,
        table: Vec<(&'static str, f64, f64)>,
        calls: Calls,
    }

    #[async_trait]
    impl GeocodeProvider for TableProvider {
        fn kind(&self) -> MatchedProvider {
            self.kind
        }

        async fn lookup(&self, query: &str) -> Result<Option<ProviderHit>, ProviderError> {
            self.calls.lock().unwrap().push((self.kind, query.to_string()));
            Ok(self
                .table
                .iter()
                .find(|(q, _, _)| *q == query)
                .map(|(_, lat, lon)| ProviderHit {
                    point: GeoPoint::new(*lat, *lon).unwrap(),
                    confidence: None,
                    label: None,
                }))
        }
    }

    struct EchoDescriber;

    #[async_trait]
    impl PlaceDescriber for EchoDescriber {
        fn name(&self) -> &str {
            "echo"
        }

        async fn describe(
            &self,
            request: &DescriptionRequest,
        ) -> Result<PlaceDescription, ProviderError> {
            Ok(PlaceDescription {
                title: request.title.to_uppercase(),
                description: format!("{} is nice.", request.title),
                category: "spot".into(),
            })
        }
    }

    fn pipeline(calls: &Calls) -> Pipeline {
        let provider = |kind, table| -> SharedProvider {
            Arc::new(TableProvider {
                kind,
                table,
                calls: Arc::clone(calls),
            })
        };
        let resolver = GeocodeResolver::new(vec![
            provider(MatchedProvider::Google, vec![]),
            provider(MatchedProvider::Nominatim, vec![("Pier 39, SF", 37.8087, -122.4098)]),
            provider(MatchedProvider::ArcGis, vec![]),
        ])
        .with_concurrency(1);
        Pipeline::new(resolver, Enricher::new(Arc::new(EchoDescriber)))
    }

    fn rows() -> Vec<SavedPlaceRow> {
        vec![
            SavedPlaceRow::new("Coit Tower", "").with_coordinates(
                GeoPoint::new(37.8024, -122.4058).unwrap(),
                MatchedProvider::Google,
            ),
            SavedPlaceRow::new("Pier 39", "Pier 39, SF"),
            SavedPlaceRow::new("Nowhere", "asdf qwerty"),
        ]
    }

    fn north_beach() -> Vec<DrawnPolygon> {
        vec![DrawnPolygon::new(vec![
            (37.79, -122.42),
            (37.79, -122.40),
            (37.82, -122.40),
            (37.82, -122.42),
        ])]
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let report = pipeline(&calls).run(rows(), &north_beach()).await;

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                (MatchedProvider::Google, "Pier 39, SF".to_string()),
                (MatchedProvider::Nominatim, "Pier 39, SF".to_string()),
                (MatchedProvider::Google, "asdf qwerty".to_string()),
                (MatchedProvider::Nominatim, "asdf qwerty".to_string()),
                (MatchedProvider::ArcGis, "asdf qwerty".to_string()),
            ]
        );

        assert_eq!(report.resolved.len(), 3);
        assert!(report.resolved[0].geocode.is_embedded());
        assert_eq!(report.resolved[1].geocode.provider(), MatchedProvider::Nominatim);
        assert_eq!(report.resolved[2].geocode.provider(), MatchedProvider::None);

        let kept: Vec<usize> = report.filter.kept.iter().map(|p| p.place.index).collect();
        assert_eq!(kept, vec![0, 1]);
        assert_eq!(report.filter.kept[1].point, GeoPoint::new(37.8087, -122.4098).unwrap());
        assert_eq!(report.filter.skipped_unresolved.len(), 1);
        assert_eq!(report.filter.skipped_unresolved[0].index, 2);
        assert_eq!(report.unresolved().count(), 1);

        assert_eq!(report.enriched.len(), 2);
        assert_eq!(report.enriched[0].title, "COIT TOWER");
        assert_eq!(report.enriched[1].status, EnrichmentStatus::Generated);
        assert_eq!(report.feature_collection().features.len(), 2);
        assert!(report.finished_at >= report.started_at);
    }

    #[tokio::test]
    async fn test_unresolved_reported_even_when_nothing_matches() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let far_away = vec![DrawnPolygon::new(vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)])];
        let report = pipeline(&calls)
            .run_without_enrichment(rows(), &far_away)
            .await;

        assert!(report.filter.kept.is_empty());
        assert!(report.enriched.is_empty());
        assert_eq!(report.filter.outside, 2);
        assert_eq!(report.filter.skipped_unresolved[0].index, 2);
    }

    #[tokio::test]
    async fn test_without_enrichment_keeps_titles() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let report = pipeline(&calls)
            .run_without_enrichment(rows(), &north_beach())
            .await;
        assert_eq!(report.enriched[0].title, "Coit Tower");
        assert!(report
            .enriched
            .iter()
            .all(|p| p.status == EnrichmentStatus::Fallback));
    }
}
