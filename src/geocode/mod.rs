//! Geocoding: provider clients and the fallback resolver.
//!
//! Providers are tried in priority order (Google, Nominatim, ArcGIS) and any
//! provider failure degrades to "not found" for that provider.

mod arcgis;
mod cache;
mod google;
mod limiter;
mod nominatim;
mod resolver;

pub use arcgis::{ArcGisGeocoder, DEFAULT_ENDPOINT as ARCGIS_ENDPOINT};
pub use cache::{normalize_query, QueryCache};
pub use google::{GoogleGeocoder, DEFAULT_ENDPOINT as GOOGLE_ENDPOINT};
pub use limiter::RateLimiter;
pub use nominatim::{NominatimGeocoder, DEFAULT_ENDPOINT as NOMINATIM_ENDPOINT};
pub use resolver::{GeocodeResolver, ResolveStats, DEFAULT_CONCURRENCY};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::Config;
use crate::error::ProviderError;
use crate::models::{GeoPoint, MatchedProvider};

/// First candidate returned by a provider, normalized
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderHit {
    pub point: GeoPoint,
    /// Provider-specific precision in 0.0..=1.0, when reported
    pub confidence: Option<f64>,
    /// Provider's label for the match (formatted address, display name)
    pub label: Option<String>,
}

/// One geocoding service behind a uniform `query -> coordinates` contract
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    fn kind(&self) -> MatchedProvider;

    /// Unconfigured providers are skipped by the resolver
    fn is_configured(&self) -> bool {
        true
    }

    /// Minimum spacing between consecutive requests, if the provider imposes one
    fn min_interval(&self) -> Option<Duration> {
        None
    }

    /// Look up a free-text query. `Ok(None)` means the provider has no match.
    async fn lookup(&self, query: &str) -> Result<Option<ProviderHit>, ProviderError>;
}

pub type SharedProvider = Arc<dyn GeocodeProvider>;

/// Build an HTTP client for provider calls
pub(crate) fn http_client(user_agent: &str, timeout: Duration) -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?)
}

/// Build the provider chain in priority order from configuration
pub fn providers_from_config(config: &Config) -> Result<Vec<SharedProvider>, ProviderError> {
    let geo = &config.geocode;
    let timeout = Duration::from_secs(geo.timeout_secs);

    let google = GoogleGeocoder::new(
        config.credentials.google_api_key.clone(),
        &geo.google_endpoint,
        http_client(&geo.user_agent, timeout)?,
    )?;

    let nominatim_agent = match &config.credentials.nominatim_email {
        Some(email) => format!("{} ({})", geo.user_agent, email),
        None => geo.user_agent.clone(),
    };
    let nominatim = NominatimGeocoder::new(
        config.credentials.nominatim_email.clone(),
        &geo.nominatim_endpoint,
        http_client(&nominatim_agent, timeout)?,
    )?
    .with_min_interval(Duration::from_millis(geo.nominatim_interval_ms));

    let arcgis = ArcGisGeocoder::new(
        &geo.arcgis_endpoint,
        http_client(&geo.user_agent, timeout)?,
    )?;

    Ok(vec![Arc::new(google), Arc::new(nominatim), Arc::new(arcgis)])
}

/// Parse an endpoint URL from configuration
pub(crate) fn parse_endpoint(endpoint: &str) -> Result<url::Url, ProviderError> {
    url::Url::parse(endpoint)
        .map_err(|e| ProviderError::Malformed(format!("invalid endpoint '{}': {}", endpoint, e)))
}

/// Read the body of a provider response, mapping HTTP failures
pub(crate) async fn response_text(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::from_status(status));
    }
    Ok(response.text().await?)
}

/// Validate a coordinate pair from a provider response
pub(crate) fn checked_point(lat: f64, lon: f64) -> Result<GeoPoint, ProviderError> {
    GeoPoint::new(lat, lon).ok_or_else(|| {
        ProviderError::malformed(format!("coordinates out of range: ({}, {})", lat, lon))
    })
}
