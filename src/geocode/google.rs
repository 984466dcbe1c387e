//! Google Maps Geocoding API client (primary provider).

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{checked_point, parse_endpoint, response_text, GeocodeProvider, ProviderHit};
use crate::error::ProviderError;
use crate::models::MatchedProvider;

pub const DEFAULT_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

pub struct GoogleGeocoder {
    /// API key stored securely - never exposed in logs or debug output
    api_key: Option<SecretString>,
    endpoint: Url,
    client: Client,
}

impl std::fmt::Debug for GoogleGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleGeocoder")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeCandidate>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeCandidate {
    geometry: CandidateGeometry,
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateGeometry {
    location: LatLng,
    location_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl GoogleGeocoder {
    pub fn new(
        api_key: Option<SecretString>,
        endpoint: &str,
        client: Client,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: api_key.filter(|k| !k.expose_secret().trim().is_empty()),
            endpoint: parse_endpoint(endpoint)?,
            client,
        })
    }

    fn request_url(&self, query: &str, key: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("address", query)
            .append_pair("key", key);
        url
    }
}

/// Map the `location_type` precision to a confidence value
fn location_type_confidence(location_type: &str) -> Option<f64> {
    match location_type {
        "ROOFTOP" => Some(1.0),
        "RANGE_INTERPOLATED" => Some(0.8),
        "GEOMETRIC_CENTER" => Some(0.6),
        "APPROXIMATE" => Some(0.4),
        _ => None,
    }
}

/// Parse a Geocoding API body, taking only the first candidate
pub(crate) fn parse_response(body: &str) -> Result<Option<ProviderHit>, ProviderError> {
    let data: GeocodeResponse = serde_json::from_str(body)?;

    match data.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(None),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => {
            return Err(ProviderError::Quota(
                data.error_message.unwrap_or_else(|| data.status.clone()),
            ))
        }
        _ => {
            return Err(ProviderError::Rejected {
                message: data.error_message.unwrap_or_default(),
                status: data.status.clone(),
            })
        }
    }

    let Some(first) = data.results.into_iter().next() else {
        return Ok(None);
    };

    let point = checked_point(first.geometry.location.lat, first.geometry.location.lng)?;
    Ok(Some(ProviderHit {
        point,
        confidence: first
            .geometry
            .location_type
            .as_deref()
            .and_then(location_type_confidence),
        label: first.formatted_address,
    }))
}

#[async_trait]
impl GeocodeProvider for GoogleGeocoder {
    fn kind(&self) -> MatchedProvider {
        MatchedProvider::Google
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn lookup(&self, query: &str) -> Result<Option<ProviderHit>, ProviderError> {
        let key = self.api_key.as_ref().ok_or(ProviderError::NotConfigured)?;

        debug!("Google geocode: '{}'", query);
        let response = self
            .client
            .get(self.request_url(query, key.expose_secret()))
            .send()
            .await?;

        let body = response_text(response).await?;
        parse_response(&body)
    }
}
