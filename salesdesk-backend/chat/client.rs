use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("no API key provided")]
    MissingCredential,

    #[error("API key rejected: {0}")]
    Unauthorized(String),

    #[error("quota or rate limit exceeded: {0}")]
    QuotaExceeded(String),

    #[error("chat API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("chat API returned no answer")]
    EmptyResponse,

    #[error("could not decode chat API response: {0}")]
    Decode(String),
}

impl ChatError {
    /// What the user can do about it.
    pub fn guidance(&self) -> &'static str {
        match self {
            ChatError::MissingCredential => "Enter your API key to use the assistant.",
            ChatError::Unauthorized(_) => "Check that your API key is correct and still active.",
            ChatError::QuotaExceeded(_) => {
                "Check that your account has credits available and wait a moment before retrying."
            }
            ChatError::Network(_) => "Check your network connection and try again.",
            ChatError::Api { .. } | ChatError::EmptyResponse | ChatError::Decode(_) => {
                "Make sure your API key is correct and you have credits available."
            }
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send `messages` and return the first choice's content.
    async fn complete(&self, api_key: &str, messages: &[ChatMessage]) -> Result<String, ChatError>;
}

// OpenAI-compatible request/response
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiChatClient {
    http_client: Arc<reqwest::Client>,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAiChatClient {
    pub fn new(
        http_client: Arc<reqwest::Client>,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            base_url,
            model,
            timeout,
        }
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, api_key: &str, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = api_error_message(&text);
            return Err(match status.as_u16() {
                401 | 403 => ChatError::Unauthorized(message),
                429 => ChatError::QuotaExceeded(message),
                code => ChatError::Api {
                    status: code,
                    message,
                },
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ChatError::EmptyResponse)
    }
}

/// Pull `error.message` out of an OpenAI-style error body, else the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}
