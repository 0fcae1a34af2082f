use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app_config::TranslationConfig;
use crate::errors::ProviderError;
use crate::providers::ChatProvider;

/// Client for OpenAI-compatible chat completion endpoints
#[derive(Debug)]
pub struct OpenAICompatible {
    /// HTTP client for making requests
    client: Client,
    /// Base URL, e.g. `https://api.openai.com/v1`
    base_url: String,
    /// Bearer token; not sent when empty
    api_key: String,
    /// Model name to request
    model: String,
    /// Sampling temperature
    temperature: f32,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user or assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Chat completion request body
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    stream: bool,
}

/// Chat completion response body (only the fields we read)
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl OpenAICompatible {
    /// Create a new client
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        // System proxies are bypassed; local endpoints are the common case
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .no_proxy()
            .build()
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        })
    }

    /// Create a client from the translation section of the config
    pub fn from_config(config: &TranslationConfig) -> Result<Self, ProviderError> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.model_name.clone(),
            config.temperature,
            config.timeout_secs,
        )
    }

    /// Full URL of the completions endpoint
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, system_prompt: &str, user_text: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_text.to_string(),
                },
            ],
            temperature: self.temperature,
            stream: false,
        }
    }

    /// Map a non-success HTTP status onto the provider error taxonomy
    fn map_status_error(status: StatusCode, body: String) -> ProviderError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(body),
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(body),
            _ => ProviderError::ApiError {
                status_code: status.as_u16(),
                message: body,
            },
        }
    }

    /// Pull the assistant text out of a response
    pub fn extract_text(response: &ChatCompletionResponse) -> Result<String, ProviderError> {
        response
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| ProviderError::ParseError("Response contained no choices".to_string()))
    }
}

#[async_trait]
impl ChatProvider for OpenAICompatible {
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String, ProviderError> {
        let request = self.build_request(system_prompt, user_text);
        let url = self.endpoint();
        debug!("POST {} (model {})", url, self.model);

        let mut builder = self.client.post(&url).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ProviderError::ConnectionError(e.to_string())
            } else {
                ProviderError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Chat API error ({}): {}", status, error_text);
            return Err(Self::map_status_error(status, error_text));
        }

        let body = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Self::extract_text(&body)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.complete("Reply with OK.", "Hello").await.map(|_| ())
    }
}
