//! Embedding service for chunk and query vectors.
//!
//! Wraps an [`EmbeddingProvider`] with batching, a per-call timeout, and
//! validation of what comes back: one vector per input, in order, of the
//! provider's fixed dimension.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Chunk;
use crate::domain::ports::embedding::{EmbeddingInput, EmbeddingProvider};

/// Embedding service that orchestrates embedding generation.
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Embed a search query.
    pub async fn embed_query(&self, text: &str) -> DomainResult<Vec<f32>> {
        let vector = self.with_timeout(self.provider.embed(text)).await?;
        self.check_vector(&vector)?;
        Ok(vector)
    }

    /// Attach a vector to every chunk, batching calls to the provider.
    ///
    /// Either every chunk comes back embedded or the call fails.
    pub async fn embed_chunks(&self, chunks: Vec<Chunk>) -> DomainResult<Vec<Chunk>> {
        if chunks.is_empty() {
            return Ok(chunks);
        }

        let inputs: Vec<EmbeddingInput> = chunks
            .iter()
            .map(|chunk| EmbeddingInput {
                id: chunk.id.clone(),
                text: chunk.text.clone(),
            })
            .collect();

        let batch_size = self.provider.max_batch_size().max(1);
        let mut vectors = Vec::with_capacity(inputs.len());

        for batch in inputs.chunks(batch_size) {
            let outputs = self.with_timeout(self.provider.embed_batch(batch)).await?;
            if outputs.len() != batch.len() {
                return Err(DomainError::EmbeddingFailed(format!(
                    "provider returned {} vectors for {} chunks",
                    outputs.len(),
                    batch.len()
                )));
            }
            for (input, output) in batch.iter().zip(outputs) {
                if output.id != input.id {
                    return Err(DomainError::EmbeddingFailed(format!(
                        "provider returned vector for '{}' in place of '{}'",
                        output.id, input.id
                    )));
                }
                self.check_vector(&output.vector)?;
                vectors.push(output.vector);
            }
        }

        Ok(chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| chunk.with_vector(vector))
            .collect())
    }

    async fn with_timeout<T>(
        &self,
        call: impl std::future::Future<Output = DomainResult<T>>,
    ) -> DomainResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| DomainError::Timeout {
                operation: format!("{} embedding call", self.provider.name()),
                secs: self.timeout.as_secs(),
            })?
    }

    fn check_vector(&self, vector: &[f32]) -> DomainResult<()> {
        let expected = self.provider.dimension();
        if vector.len() != expected {
            return Err(DomainError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(DomainError::EmbeddingFailed(
                "provider returned a non-finite vector component".to_string(),
            ));
        }
        Ok(())
    }
}
