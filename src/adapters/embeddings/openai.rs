//! OpenAI embedding provider adapter.
//!
//! Calls the `/embeddings` endpoint of any OpenAI-compatible API
//! (OpenAI, Azure OpenAI, local servers).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::embedding::{EmbeddingInput, EmbeddingOutput, EmbeddingProvider};

/// OpenAI embedding provider.
pub struct OpenAiEmbeddingProvider {
    api_key: Option<String>,
    base_url: String,
    model: String,
    dimension: usize,
    max_batch_size: usize,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DomainError::ExecutionFailed(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            max_batch_size: config.batch_size.max(1),
            client,
        })
    }

    fn api_key(&self) -> DomainResult<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            DomainError::EmbeddingFailed(
                "OpenAI API key not set. Set OPENAI_API_KEY or embedding.api_key.".to_string(),
            )
        })
    }

    async fn call_embeddings_api(&self, texts: Vec<String>) -> DomainResult<Vec<Vec<f32>>> {
        let expected = texts.len();
        let url = format!("{}/embeddings", self.base_url);
        let request_body = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key()?)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| DomainError::EmbeddingFailed(format!("Embedding API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(DomainError::EmbeddingFailed(format!(
                "Embedding API returned {status}: {body}"
            )));
        }

        let result: EmbeddingsResponse = response.json().await.map_err(|e| {
            DomainError::EmbeddingFailed(format!("Failed to parse embedding response: {e}"))
        })?;

        if result.data.len() != expected {
            return Err(DomainError::EmbeddingFailed(format!(
                "Embedding API returned {} vectors for {expected} inputs",
                result.data.len()
            )));
        }

        // Sort by index to maintain input order
        let mut data = result.data;
        data.sort_by_key(|d| d.index);

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
        let results = self.call_embeddings_api(vec![text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::EmbeddingFailed("Empty embedding response".to_string()))
    }

    async fn embed_batch(&self, inputs: &[EmbeddingInput]) -> DomainResult<Vec<EmbeddingOutput>> {
        let mut all_outputs = Vec::with_capacity(inputs.len());

        for batch in inputs.chunks(self.max_batch_size) {
            let texts = batch.iter().map(|i| i.text.clone()).collect();
            let vectors = self.call_embeddings_api(texts).await?;

            all_outputs.extend(batch.iter().zip(vectors).map(|(input, vector)| {
                EmbeddingOutput {
                    id: input.id.clone(),
                    vector,
                }
            }));
        }

        Ok(all_outputs)
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}

// -- OpenAI API request/response types --

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
