//! OpenAI-compatible provider backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use thoughtmarks_core::defaults::{
    CHAT_MODEL, CHAT_TIMEOUT_SECS, EMBED_DIMENSION, EMBED_MODEL, EMBED_TIMEOUT_SECS,
};
use thoughtmarks_core::{CompletionOptions, EmbeddingBackend, Error, Result, SuggestionBackend};

use super::types::*;

/// Default OpenAI API endpoint.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Configuration for the OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Model to use for embeddings.
    pub embed_model: String,
    /// Model to use for chat completions.
    pub chat_model: String,
    /// Expected embedding dimension.
    pub embed_dimension: usize,
    /// Timeout for embedding requests in seconds.
    pub embed_timeout_secs: u64,
    /// Timeout for chat completion requests in seconds.
    pub chat_timeout_secs: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: None,
            embed_model: EMBED_MODEL.to_string(),
            chat_model: CHAT_MODEL.to_string(),
            embed_dimension: EMBED_DIMENSION,
            embed_timeout_secs: EMBED_TIMEOUT_SECS,
            chat_timeout_secs: CHAT_TIMEOUT_SECS,
        }
    }
}

/// OpenAI-compatible provider backend.
///
/// Implements both [`EmbeddingBackend`] and [`SuggestionBackend`]; one shared
/// instance serves both concerns.
pub struct OpenAIBackend {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing OpenAI backend: url={}, embed={}, chat={}",
            config.base_url, config.embed_model, config.chat_model
        );

        Ok(Self { client, config })
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(OpenAIConfig::default())
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        let config = OpenAIConfig {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_URL.to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            embed_model: std::env::var("OPENAI_EMBED_MODEL")
                .unwrap_or_else(|_| EMBED_MODEL.to_string()),
            chat_model: std::env::var("OPENAI_CHAT_MODEL")
                .unwrap_or_else(|_| CHAT_MODEL.to_string()),
            embed_dimension: std::env::var("OPENAI_EMBED_DIM")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(EMBED_DIMENSION),
            embed_timeout_secs: std::env::var("OPENAI_EMBED_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(EMBED_TIMEOUT_SECS),
            chat_timeout_secs: std::env::var("OPENAI_CHAT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(CHAT_TIMEOUT_SECS),
        };

        Self::new(config)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Whether an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Build a POST request with authentication if configured.
    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        req.header("Content-Type", "application/json")
    }

    /// Decode a non-2xx response into the provider error envelope.
    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        let body: OpenAIErrorResponse = response.json().await.unwrap_or(OpenAIErrorResponse {
            error: OpenAIError {
                message: "Unknown error".to_string(),
                error_type: "unknown".to_string(),
                code: None,
            },
        });
        format!("OpenAI returned {}: {}", status, body.error.message)
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAIBackend {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        debug!(
            "Embedding text with model {}, length: {}",
            self.config.embed_model,
            text.len()
        );

        let request = EmbeddingRequest {
            model: self.config.embed_model.clone(),
            input: text.to_string(),
            encoding_format: Some("float".to_string()),
        };

        let response = self
            .build_request("/embeddings")
            .timeout(Duration::from_secs(self.config.embed_timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Embedding(Self::error_message(response).await));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse response: {}", e)))?;

        let vector = result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Embedding("Response carried no embedding data".to_string()))?;

        debug!("Generated embedding with {} dimensions", vector.len());
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.config.embed_dimension
    }

    fn model_name(&self) -> &str {
        &self.config.embed_model
    }
}

#[async_trait]
impl SuggestionBackend for OpenAIBackend {
    async fn complete_json(
        &self,
        system: &str,
        prompt: &str,
        opts: CompletionOptions,
    ) -> Result<String> {
        debug!(
            "JSON completion with model {}, prompt length: {}",
            self.config.chat_model,
            prompt.len()
        );

        let mut messages = Vec::new();

        if !system.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }

        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request = ChatCompletionRequest {
            model: self.config.chat_model.clone(),
            messages,
            temperature: Some(opts.temperature),
            max_tokens: opts.max_tokens,
            response_format: Some(ResponseFormat::json_object()),
        };

        let response = self
            .build_request("/chat/completions")
            .timeout(Duration::from_secs(self.config.chat_timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Suggestion(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Suggestion(Self::error_message(response).await));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Suggestion(format!("Failed to parse response: {}", e)))?;

        let content = result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        debug!("Completion finished, response length: {}", content.len());
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.chat_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = OpenAIConfig::default();
        assert_eq!(config.base_url, DEFAULT_OPENAI_URL);
        assert_eq!(config.embed_model, EMBED_MODEL);
        assert_eq!(config.chat_model, CHAT_MODEL);
        assert_eq!(config.embed_dimension, EMBED_DIMENSION);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn backend_creation() {
        let backend = OpenAIBackend::with_defaults().unwrap();
        assert_eq!(backend.config().base_url, DEFAULT_OPENAI_URL);
        assert!(!backend.has_api_key());
    }

    #[test]
    fn dimension_accessor() {
        let config = OpenAIConfig {
            embed_dimension: 512,
            ..Default::default()
        };
        let backend = OpenAIBackend::new(config).unwrap();
        assert_eq!(backend.dimension(), 512);
    }

    #[test]
    fn model_name_accessors() {
        let config = OpenAIConfig {
            embed_model: "test-embed".to_string(),
            chat_model: "test-chat".to_string(),
            ..Default::default()
        };
        let backend = OpenAIBackend::new(config).unwrap();
        assert_eq!(EmbeddingBackend::model_name(&backend), "test-embed");
        assert_eq!(SuggestionBackend::model_name(&backend), "test-chat");
    }
}
