//! OpenAI-compatible text generation.
//!
//! This module provides an implementation of the `TextGenerator` trait for any
//! server implementing the OpenAI Chat Completions API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use spendcast_abstraction::{CollaboratorError, TextGenerator};
use tracing::{debug, error};

/// Default OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model used for narration.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Environment variable holding the text generation access token.
pub const TOKEN_ENV: &str = "TEXTGEN_API_KEY";

/// OpenAI-compatible text generator.
#[derive(Debug, Clone)]
pub struct OpenAiTextGenerator {
    /// The model ID (e.g., "gpt-4o-mini").
    model_id: String,
    /// The API key; calls fail with `NotConfigured` when absent.
    api_key: Option<String>,
    /// The base URL for the API.
    base_url: String,
    /// Sampling temperature.
    temperature: Option<f32>,
    /// Maximum completion length.
    max_tokens: Option<u32>,
    /// HTTP client for making requests.
    client: Client,
}

impl OpenAiTextGenerator {
    /// Creates a generator for the given model.
    ///
    /// # Arguments
    /// * `model_id` - The model ID to use
    /// * `api_key` - The API key, if one is configured
    #[must_use]
    pub fn new(model_id: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            model_id: model_id.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: Some(0.7),
            max_tokens: Some(512),
            client: crate::http_client(),
        }
    }

    /// Points the generator at a different OpenAI-compatible server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The model ID requests are sent with.
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn generate_text(&self, prompt: &str) -> Result<String, CollaboratorError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            CollaboratorError::NotConfigured(format!("{TOKEN_ENV} is not set"))
        })?;

        debug!(
            model_id = %self.model_id,
            prompt_len = prompt.len(),
            "OpenAiTextGenerator generating text"
        );

        let url = format!("{}/chat/completions", self.base_url);
        let request_body = OpenAIRequest {
            model: self.model_id.clone(),
            messages: vec![OpenAIMessage { role: "user".to_string(), content: prompt.to_string() }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to text generation API");
                CollaboratorError::Request(format!("Network error: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = crate::error_body(response).await;
            error!(status = %status, error = %message, "Text generation API returned error status");
            return Err(CollaboratorError::UpstreamHttp {
                service: "narration".to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse text generation response");
            CollaboratorError::MalformedResponse(format!("Failed to parse response: {e}"))
        })?;

        openai_response.choices.into_iter().next().map(|c| c.message.content).ok_or_else(|| {
            error!("No content in text generation response");
            CollaboratorError::MalformedResponse("No content in API response".to_string())
        })
    }
}

// OpenAI API request/response structures

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}
