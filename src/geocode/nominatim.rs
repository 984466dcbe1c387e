//! OpenStreetMap Nominatim client (secondary provider).
//!
//! Nominatim's usage policy asks for an identifying contact and at most one
//! request per second; the resolver enforces the spacing via `min_interval`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{checked_point, parse_endpoint, response_text, GeocodeProvider, ProviderHit};
use crate::error::ProviderError;
use crate::models::MatchedProvider;

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct NominatimGeocoder {
    /// Contact address sent with every request
    email: Option<String>,
    endpoint: Url,
    client: Client,
    min_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: Option<String>,
    importance: Option<f64>,
}

impl NominatimGeocoder {
    pub fn new(
        email: Option<String>,
        endpoint: &str,
        client: Client,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            email: email.filter(|e| !e.trim().is_empty()),
            endpoint: parse_endpoint(endpoint)?,
            client,
            min_interval: DEFAULT_MIN_INTERVAL,
        })
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    fn request_url(&self, query: &str, email: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "jsonv2")
            .append_pair("limit", "1")
            .append_pair("email", email);
        url
    }
}

/// Parse a `/search` body. Coordinates arrive as strings.
pub(crate) fn parse_response(body: &str) -> Result<Option<ProviderHit>, ProviderError> {
    let places: Vec<NominatimPlace> = serde_json::from_str(body)?;

    let Some(first) = places.into_iter().next() else {
        return Ok(None);
    };

    let lat: f64 = first
        .lat
        .trim()
        .parse()
        .map_err(|_| ProviderError::malformed(format!("latitude '{}'", first.lat)))?;
    let lon: f64 = first
        .lon
        .trim()
        .parse()
        .map_err(|_| ProviderError::malformed(format!("longitude '{}'", first.lon)))?;

    Ok(Some(ProviderHit {
        point: checked_point(lat, lon)?,
        confidence: first.importance.map(|i| i.clamp(0.0, 1.0)),
        label: first.display_name,
    }))
}

#[async_trait]
impl GeocodeProvider for NominatimGeocoder {
    fn kind(&self) -> MatchedProvider {
        MatchedProvider::Nominatim
    }

    fn is_configured(&self) -> bool {
        self.email.is_some()
    }

    fn min_interval(&self) -> Option<Duration> {
        Some(self.min_interval)
    }

    async fn lookup(&self, query: &str) -> Result<Option<ProviderHit>, ProviderError> {
        let email = self.email.as_deref().ok_or(ProviderError::NotConfigured)?;

        debug!("Nominatim search: '{}'", query);
        let response = self
            .client
            .get(self.request_url(query, email))
            .send()
            .await?;

        let body = response_text(response).await?;
        parse_response(&body)
    }
}
