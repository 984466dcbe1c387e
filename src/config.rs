//! Process-wide configuration, read once at startup.
//!
//! Values come from an optional TOML file; credentials in the environment
//! (`GOOGLE_MAPS_API_KEY`, `OSM_EMAIL`, `OPENAI_API_KEY`) take precedence.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

use crate::enrich;
use crate::geocode;
use crate::models::MatchedProvider;

pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_MAPS_API_KEY";
pub const ENV_OSM_EMAIL: &str = "OSM_EMAIL";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub credentials: Credentials,
    pub geocode: GeocodeConfig,
    pub enrichment: EnrichmentConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Credentials {
    #[serde(deserialize_with = "secret_or_none")]
    pub google_api_key: Option<SecretString>,
    /// Contact address for the Nominatim usage policy
    #[serde(deserialize_with = "text_or_none")]
    pub nominatim_email: Option<String>,
    #[serde(deserialize_with = "secret_or_none")]
    pub enrichment_api_key: Option<SecretString>,
}

/// Blank values count as unset
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn text_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(non_blank(Option::deserialize(deserializer)?))
}

fn secret_or_none<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SecretString>, D::Error> {
    Ok(non_blank(Option::deserialize(deserializer)?).map(SecretString::from))
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocodeConfig {
    /// Rows geocoded concurrently
    pub concurrency: usize,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Minimum spacing between Nominatim requests
    pub nominatim_interval_ms: u64,
    pub user_agent: String,
    pub google_endpoint: String,
    pub nominatim_endpoint: String,
    pub arcgis_endpoint: String,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            concurrency: geocode::DEFAULT_CONCURRENCY,
            timeout_secs: 10,
            nominatim_interval_ms: 1000,
            user_agent: concat!("placesift/", env!("CARGO_PKG_VERSION")).to_string(),
            google_endpoint: geocode::GOOGLE_ENDPOINT.to_string(),
            nominatim_endpoint: geocode::NOMINATIM_ENDPOINT.to_string(),
            arcgis_endpoint: geocode::ARCGIS_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub model: String,
    pub endpoint: String,
    pub concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: enrich::OPENAI_MODEL.to_string(),
            endpoint: enrich::OPENAI_ENDPOINT.to_string(),
            concurrency: enrich::DEFAULT_CONCURRENCY,
            timeout_secs: 30,
        }
    }
}

/// A configuration problem found at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// The caller asked for this provider explicitly
    pub required: bool,
    pub message: String,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load the file if given, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override credentials from a variable lookup (normally the environment)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| non_blank(lookup(name));

        if let Some(key) = non_empty(ENV_GOOGLE_API_KEY) {
            self.credentials.google_api_key = Some(SecretString::from(key));
        }
        if let Some(email) = non_empty(ENV_OSM_EMAIL) {
            self.credentials.nominatim_email = Some(email);
        }
        if let Some(key) = non_empty(ENV_OPENAI_API_KEY) {
            self.credentials.enrichment_api_key = Some(SecretString::from(key));
        }
    }

    /// Reject settings no run could work with
    pub fn validate(&self) -> Result<()> {
        for (name, endpoint) in [
            ("geocode.google_endpoint", &self.geocode.google_endpoint),
            ("geocode.nominatim_endpoint", &self.geocode.nominatim_endpoint),
            ("geocode.arcgis_endpoint", &self.geocode.arcgis_endpoint),
            ("enrichment.endpoint", &self.enrichment.endpoint),
        ] {
            url::Url::parse(endpoint)
                .with_context(|| format!("Invalid URL for {}: '{}'", name, endpoint))?;
        }
        if self.geocode.timeout_secs == 0 || self.enrichment.timeout_secs == 0 {
            anyhow::bail!("Timeouts must be at least one second");
        }
        Ok(())
    }

    /// Report missing credentials.
    ///
    /// Missing credentials never stop a run: the provider is skipped. A
    /// provider listed in `required` produces a warning flagged as required.
    pub fn check(&self, required: &[MatchedProvider]) -> Vec<ConfigWarning> {
        let creds = &self.credentials;
        let mut warnings = Vec::new();

        let missing = [
            (
                MatchedProvider::Google,
                creds.google_api_key.is_none(),
                ENV_GOOGLE_API_KEY,
            ),
            (
                MatchedProvider::Nominatim,
                creds.nominatim_email.is_none(),
                ENV_OSM_EMAIL,
            ),
        ];
        for (provider, is_missing, var) in missing {
            if is_missing {
                warnings.push(ConfigWarning {
                    required: required.contains(&provider),
                    message: format!(
                        "{} has no credentials ({} not set); every lookup will skip it",
                        provider, var
                    ),
                });
            }
        }

        if self.enrichment.enabled && creds.enrichment_api_key.is_none() {
            warnings.push(ConfigWarning {
                required: false,
                message: format!(
                    "Enrichment has no API key ({} not set); descriptions will be empty",
                    ENV_OPENAI_API_KEY
                ),
            });
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.geocode.nominatim_interval_ms, 1000);
        assert!(config.enrichment.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[credentials]
nominatim_email = "me@example.com"

[geocode]
concurrency = 2
nominatim_endpoint = "http://localhost:8080/search"
"#
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.credentials.nominatim_email.as_deref(), Some("me@example.com"));
        assert_eq!(config.geocode.concurrency, 2);
        assert_eq!(config.geocode.timeout_secs, 10);
        assert_eq!(config.geocode.nominatim_endpoint, "http://localhost:8080/search");
        assert_eq!(config.enrichment.model, enrich::OPENAI_MODEL);
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[geocode]\nconcurrency = \"many\"").unwrap();
        assert!(Config::load_from_file(file.path()).is_err());
        assert!(Config::load_from_file("/nonexistent/placesift.toml").is_err());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = Config::default();
        config.credentials.google_api_key = Some("from-file".into());
        config.apply_overrides(|name| match name {
            ENV_GOOGLE_API_KEY => Some("from-env".into()),
            ENV_OSM_EMAIL => Some("   ".into()),
            _ => None,
        });
        assert_eq!(
            config
                .credentials
                .google_api_key
                .as_ref()
                .map(|k| k.expose_secret()),
            Some("from-env")
        );
        assert!(config.credentials.nominatim_email.is_none());
    }

    #[test]
    fn test_invalid_endpoint_fails_validation() {
        let mut config = Config::default();
        config.geocode.arcgis_endpoint = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_check_flags_required_providers() {
        let config = Config::default();
        let warnings = config.check(&[MatchedProvider::Google]);
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].required);
        assert!(warnings[0].message.contains(ENV_GOOGLE_API_KEY));
        assert!(!warnings[1].required);

        let mut config = Config::default();
        config.credentials.google_api_key = Some("k".into());
        config.credentials.nominatim_email = Some("e".into());
        config.credentials.enrichment_api_key = Some("o".into());
        assert!(config.check(&[MatchedProvider::Google]).is_empty());
    }

    #[test]
    fn test_blank_credentials_in_file_count_as_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[credentials]
google_api_key = ""
nominatim_email = "me@example.com"
enrichment_api_key = "   "
"#
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert!(config.credentials.google_api_key.is_none());
        assert!(config.credentials.enrichment_api_key.is_none());

        let warnings = config.check(&[MatchedProvider::Google]);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].required);
        assert!(warnings[0].message.contains(ENV_GOOGLE_API_KEY));
        assert!(warnings[1].message.contains(ENV_OPENAI_API_KEY));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let mut config = Config::default();
        config.credentials.google_api_key = Some("secret-key".into());
        assert!(!format!("{:?}", config).contains("secret-key"));
    }
}
