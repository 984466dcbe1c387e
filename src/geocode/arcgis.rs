//! ArcGIS World Geocoding Service client (last-resort provider, no key needed).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{checked_point, parse_endpoint, response_text, GeocodeProvider, ProviderHit};
use crate::error::ProviderError;
use crate::models::MatchedProvider;

pub const DEFAULT_ENDPOINT: &str =
    "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer/findAddressCandidates";

#[derive(Debug)]
pub struct ArcGisGeocoder {
    endpoint: Url,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct CandidatesResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    address: Option<String>,
    location: Location,
    score: Option<f64>,
}

/// x is longitude, y is latitude (WGS84)
#[derive(Debug, Deserialize)]
struct Location {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: Option<i64>,
    message: Option<String>,
}

impl ArcGisGeocoder {
    pub fn new(endpoint: &str, client: Client) -> Result<Self, ProviderError> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            client,
        })
    }

    fn request_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("SingleLine", query)
            .append_pair("f", "json")
            .append_pair("maxLocations", "1")
            .append_pair("outSR", "4326");
        url
    }
}

/// Parse a `findAddressCandidates` body. Errors arrive with HTTP 200.
pub(crate) fn parse_response(body: &str) -> Result<Option<ProviderHit>, ProviderError> {
    let data: CandidatesResponse = serde_json::from_str(body)?;

    if let Some(err) = data.error {
        return Err(ProviderError::Rejected {
            status: err.code.map(|c| c.to_string()).unwrap_or_default(),
            message: err.message.unwrap_or_default(),
        });
    }

    let candidates = data
        .candidates
        .ok_or_else(|| ProviderError::malformed("missing 'candidates'"))?;

    let Some(first) = candidates.into_iter().next() else {
        return Ok(None);
    };

    Ok(Some(ProviderHit {
        point: checked_point(first.location.y, first.location.x)?,
        confidence: first.score.map(|s| (s / 100.0).clamp(0.0, 1.0)),
        label: first.address,
    }))
}

#[async_trait]
impl GeocodeProvider for ArcGisGeocoder {
    fn kind(&self) -> MatchedProvider {
        MatchedProvider::ArcGis
    }

    async fn lookup(&self, query: &str) -> Result<Option<ProviderHit>, ProviderError> {
        debug!("ArcGIS geocode: '{}'", query);
        let response = self.client.get(self.request_url(query)).send().await?;
        let body = response_text(response).await?;
        parse_response(&body)
    }
}
