//! OpenAI Chat Completions describer.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DescriptionRequest, PlaceDescriber, PlaceDescription};
use crate::error::ProviderError;
use crate::geocode::{http_client, parse_endpoint};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You are an assistant that writes concise, informative descriptions of places. \
Respond only with a JSON object with the keys \"title\" (the name of the place), \
\"description\" (one to three sentences) and \"category\" (a short label such as \"restaurant\" or \"museum\").";

/// Describer backed by OpenAI with secure API key handling
pub struct OpenAiDescriber {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    endpoint: url::Url,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiDescriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiDescriber")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}

/// Lenient shape of the model's JSON answer
#[derive(Debug, Deserialize)]
struct RawDescription {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
}

impl OpenAiDescriber {
    pub fn new(
        api_key: SecretString,
        endpoint: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key,
            endpoint: parse_endpoint(endpoint)?,
            model: model.to_string(),
            client: http_client(concat!("placesift/", env!("CARGO_PKG_VERSION")), timeout)?,
        })
    }

    fn build_request(&self, request: &DescriptionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt(),
                },
            ],
            temperature: 0.2,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        }
    }
}

/// Extract the description from a Chat Completions body
pub(crate) fn parse_completion(body: &str) -> Result<PlaceDescription, ProviderError> {
    let data: ChatCompletionResponse = serde_json::from_str(body)?;
    let message = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::malformed("no choices in completion"))?
        .message;

    if let Some(refusal) = message.refusal.filter(|r| !r.is_empty()) {
        return Err(ProviderError::Rejected {
            status: "refusal".to_string(),
            message: refusal,
        });
    }

    let content = message
        .content
        .ok_or_else(|| ProviderError::malformed("completion without content"))?;
    parse_description(&content)
}

/// Parse the model's JSON answer, tolerating a fenced code block
pub(crate) fn parse_description(content: &str) -> Result<PlaceDescription, ProviderError> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed);

    let raw: RawDescription = serde_json::from_str(json.trim())?;

    let title = raw.title.map(|t| t.trim().to_string()).unwrap_or_default();
    if title.is_empty() {
        return Err(ProviderError::malformed("description without title"));
    }

    let category = raw
        .category
        .or_else(|| raw.categories.into_iter().next())
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    Ok(PlaceDescription {
        title,
        description: raw
            .description
            .map(|d| d.trim().to_string())
            .unwrap_or_default(),
        category,
    })
}

#[async_trait]
impl PlaceDescriber for OpenAiDescriber {
    fn name(&self) -> &str {
        &self.model
    }

    async fn describe(
        &self,
        request: &DescriptionRequest,
    ) -> Result<PlaceDescription, ProviderError> {
        debug!("Requesting description for '{}'", request.title);

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.build_request(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("OpenAI error body: {}", body);
            return Err(ProviderError::from_status(status));
        }

        let body = response.text().await?;
        parse_completion(&body)
    }
}
