//! Library error types.
//!
//! None of these abort a pipeline run: provider errors degrade to "not found"
//! for that provider and polygon errors drop the offending polygon.

use thiserror::Error;

/// Failure talking to an external geocoding or text-generation service
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("quota or rate limit exceeded: {0}")]
    Quota(String),

    #[error("request rejected ({status}): {message}")]
    Rejected { status: String, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("provider is not configured")]
    NotConfigured,
}

impl ProviderError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        ProviderError::Malformed(msg.into())
    }

    /// Map a non-success HTTP status to an error
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            ProviderError::Quota(status.to_string())
        } else {
            ProviderError::Status(status.as_u16())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::Malformed(e.to_string())
    }
}

/// A filter polygon that cannot be used for membership tests
#[derive(Debug, Error, PartialEq)]
pub enum PolygonError {
    #[error("ring has {0} distinct vertices, need at least 3")]
    TooFewVertices(usize),

    #[error("ring has zero area")]
    ZeroArea,

    #[error("vertex ({lat}, {lon}) is not a valid coordinate")]
    InvalidVertex { lat: f64, lon: f64 },

    #[error("unsupported geometry type '{0}', expected Polygon or MultiPolygon")]
    UnsupportedGeometry(String),

    #[error("malformed geometry: {0}")]
    Malformed(String),
}

/// Failure reading an exported saved-places file
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
}
