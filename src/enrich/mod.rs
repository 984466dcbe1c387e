//! Enrichment: short generated titles, descriptions and categories.
//!
//! The text-generation service is an external collaborator. A record whose
//! request fails for any reason keeps its original title and gets an empty
//! description and category; other records are unaffected.

mod openai;

pub use openai::{
    OpenAiDescriber, DEFAULT_ENDPOINT as OPENAI_ENDPOINT, DEFAULT_MODEL as OPENAI_MODEL,
};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::ProviderError;
use crate::models::{EnrichedPlace, EnrichmentStatus, FilteredPlace};

pub const DEFAULT_CONCURRENCY: usize = 4;

/// What the describer is asked about one place
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptionRequest {
    pub title: String,
    pub address: String,
    pub category_hints: Vec<String>,
}

impl DescriptionRequest {
    /// Build the request from a record; the same record always gives the same request
    pub fn from_place(place: &FilteredPlace) -> Self {
        let row = place.row();
        let title = match row.title.trim() {
            "" => row.location.trim().to_string(),
            t => t.to_string(),
        };
        let address = if row.location.trim() == title {
            String::new()
        } else {
            row.location.trim().to_string()
        };
        let category_hints = row
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            title,
            address,
            category_hints,
        }
    }

    /// Render the user prompt
    pub fn prompt(&self) -> String {
        let mut prompt = format!("Place name: {}\n", self.title);
        if !self.address.is_empty() {
            prompt.push_str(&format!("Address: {}\n", self.address));
        }
        if !self.category_hints.is_empty() {
            prompt.push_str(&format!("Categories: {}\n", self.category_hints.join(", ")));
        }
        prompt.push_str("Provide a concise description:");
        prompt
    }
}

/// Structured answer from the describer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceDescription {
    pub title: String,
    pub description: String,
    pub category: String,
}

/// A text-generation service producing place descriptions
#[async_trait]
pub trait PlaceDescriber: Send + Sync {
    fn name(&self) -> &str;

    async fn describe(&self, request: &DescriptionRequest)
        -> Result<PlaceDescription, ProviderError>;
}

pub type SharedDescriber = Arc<dyn PlaceDescriber>;

/// Enriches filtered places concurrently, preserving order
pub struct Enricher {
    describer: Option<SharedDescriber>,
    concurrency: usize,
    timeout: Option<Duration>,
    progress: Option<ProgressBar>,
}

impl Enricher {
    pub fn new(describer: SharedDescriber) -> Self {
        Self {
            describer: Some(describer),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: None,
            progress: None,
        }
    }

    /// An enricher that falls back for every record
    pub fn disabled() -> Self {
        Self {
            describer: None,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: None,
            progress: None,
        }
    }

    /// Build from configuration; a missing API key disables enrichment
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let enrichment = &config.enrichment;
        let Some(api_key) = config.credentials.enrichment_api_key.clone() else {
            warn!("No enrichment API key configured; descriptions will be left empty");
            return Ok(Self::disabled());
        };

        let describer = OpenAiDescriber::new(
            api_key,
            &enrichment.endpoint,
            &enrichment.model,
            Duration::from_secs(enrichment.timeout_secs),
        )?;

        Ok(Self::new(Arc::new(describer))
            .with_concurrency(enrichment.concurrency)
            .with_timeout(Duration::from_secs(enrichment.timeout_secs)))
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Per-record deadline; an expired call falls back like any other failure
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.describer.is_some()
    }

    /// Enrich every place. Output is one-to-one with `places`, same order.
    pub async fn enrich(&self, places: Vec<FilteredPlace>) -> Vec<EnrichedPlace> {
        let Some(describer) = &self.describer else {
            return places.into_iter().map(EnrichedPlace::fallback).collect();
        };

        info!(
            "Generating descriptions for {} places with {}...",
            places.len(),
            describer.name()
        );
        if let Some(pb) = &self.progress {
            pb.set_length(places.len() as u64);
        }

        let enriched: Vec<EnrichedPlace> = stream::iter(places)
            .map(|place| async move {
                let result = self.enrich_one(describer.as_ref(), place).await;
                if let Some(pb) = &self.progress {
                    pb.inc(1);
                }
                result
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
        let generated = enriched
            .iter()
            .filter(|p| p.status == EnrichmentStatus::Generated)
            .count();
        info!(
            "Generated {} descriptions, {} fell back to the original title",
            generated,
            enriched.len() - generated
        );

        enriched
    }

    async fn enrich_one(
        &self,
        describer: &dyn PlaceDescriber,
        place: FilteredPlace,
    ) -> EnrichedPlace {
        let request = DescriptionRequest::from_place(&place);

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, describer.describe(&request)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Description for '{}' timed out", request.title);
                    return EnrichedPlace::fallback(place);
                }
            },
            None => describer.describe(&request).await,
        };

        match result {
            Ok(description) => EnrichedPlace {
                place,
                title: description.title,
                description: description.description,
                category: description.category,
                status: EnrichmentStatus::Generated,
            },
            Err(e) => {
                warn!("Description failed for '{}': {}", request.title, e);
                EnrichedPlace::fallback(place)
            }
        }
    }
}
