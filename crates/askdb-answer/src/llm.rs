//! OpenAI-compatible chat-completion client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use askdb_core::error::{Error, Result};
use askdb_core::traits::LanguageModel;

/// Connection settings for the chat-completion service.
#[derive(Debug, Clone)]
pub struct ChatClientOptions {
    pub api_key: String,
    pub model: String,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ChatClientOptions {
    /// Create options with an API key, using defaults for the rest.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 1024,
            temperature: 0.2,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure or compatible APIs).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct ChatClient {
    client: reqwest::Client,
    options: ChatClientOptions,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl ChatClient {
    pub fn new(options: ChatClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self { client, options })
    }
}

/// Passages become the system context verbatim, numbered so the model can
/// refer back to them.
fn context_block(passages: &[String]) -> String {
    let mut block = String::from("Answer the question using only the passages below.\n");
    for (i, passage) in passages.iter().enumerate() {
        block.push_str(&format!("\n[{}] {}\n", i + 1, passage));
    }
    block
}

#[async_trait]
impl LanguageModel for ChatClient {
    async fn generate(&self, passages: &[String], question: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if !passages.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: context_block(passages),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: question.to_string(),
        });

        let request = ChatRequest {
            model: self.options.model.clone(),
            messages,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };
        let url = format!("{}/chat/completions", self.options.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.options.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout {
                        operation: "chat completion",
                        after: self.options.timeout,
                    }
                } else {
                    Error::Generation(format!("request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(String::from))
                .unwrap_or(body);
            return Err(Error::Generation(format!("api error {status}: {message}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("parse error: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Generation("empty response".to_string()))
    }
}
