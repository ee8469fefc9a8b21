//! OpenAI-compatible `/embeddings` client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use askdb_core::error::{Error, Result};
use askdb_core::traits::EmbeddingProvider;

/// Connection settings for the embedding service.
#[derive(Debug, Clone)]
pub struct EmbeddingClientOptions {
    pub api_key: String,
    /// Model to use (default: text-embedding-3-small).
    pub model: String,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    pub dimension: usize,
    /// Upper bound on texts per request, the provider's documented batch
    /// limit. Callers split larger inputs (see `SemanticOptions::batch_size`).
    pub max_batch: usize,
    pub timeout: Duration,
}

impl EmbeddingClientOptions {
    /// Create options with an API key, using defaults for the rest.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            dimension: 1536,
            max_batch: 64,
            timeout: Duration::from_secs(30),
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

    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dimension = dim;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    options: EmbeddingClientOptions,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl HttpEmbeddingProvider {
    pub fn new(options: EmbeddingClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self { client, options })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn dim(&self) -> usize {
        self.options.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        if texts.len() > self.options.max_batch {
            return Err(Error::EmbeddingProvider(format!(
                "batch of {} exceeds provider limit {}",
                texts.len(),
                self.options.max_batch
            )));
        }

        let request = EmbeddingRequest {
            input: texts.to_vec(),
            model: self.options.model.clone(),
        };
        let url = format!("{}/embeddings", self.options.base_url);

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
                        operation: "embedding request",
                        after: self.options.timeout,
                    }
                } else {
                    Error::EmbeddingProvider(format!("request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(Error::EmbeddingProvider(format!(
                "api error {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::EmbeddingProvider(format!("parse error: {e}")))?;

        if parsed.data.len() != texts.len() {
            return Err(Error::EmbeddingProvider(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        debug!(count = parsed.data.len(), "generated embeddings");
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}
