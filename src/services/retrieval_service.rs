//! Retrieval service: the read side of the vector index.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{RetrievalConfig, SearchHit};
use crate::domain::ports::CompletionProvider;
use crate::infrastructure::vector::SharedIndex;
use crate::services::embedding_service::EmbeddingService;

/// Answers queries from the indexed chunks.
pub struct RetrievalService {
    index: SharedIndex,
    embeddings: Arc<EmbeddingService>,
    completion: Arc<dyn CompletionProvider>,
    config: RetrievalConfig,
    completion_timeout: Duration,
}

impl RetrievalService {
    pub fn new(
        index: SharedIndex,
        embeddings: Arc<EmbeddingService>,
        completion: Arc<dyn CompletionProvider>,
        config: RetrievalConfig,
        completion_timeout: Duration,
    ) -> Self {
        Self {
            index,
            embeddings,
            completion,
            config,
            completion_timeout,
        }
    }

    /// Rank indexed chunks against `query`, best first.
    ///
    /// `top_k` defaults to the configured value; hits below the similarity
    /// threshold are dropped.
    pub async fn search(&self, query: &str, top_k: Option<usize>) -> DomainResult<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::ValidationFailed(
                "query is null or empty".to_string(),
            ));
        }

        let k = top_k.unwrap_or(self.config.top_k);
        if k == 0 || k > self.config.max_top_k {
            return Err(DomainError::ValidationFailed(format!(
                "top_k must be between 1 and {}",
                self.config.max_top_k
            )));
        }

        let vector = self.embeddings.embed_query(query).await?;
        let hits = self.index.read().await.search(&vector, k)?;

        Ok(hits
            .into_iter()
            .filter(|hit| hit.score >= self.config.similarity_threshold)
            .collect())
    }

    /// Generate an answer grounded on the top-ranked chunks.
    pub async fn answer(&self, query: &str) -> DomainResult<String> {
        let hits = self.search(query, None).await?;
        let context: Vec<String> = hits.into_iter().map(|hit| hit.chunk.text).collect();

        tracing::debug!(
            provider = self.completion.name(),
            context_chunks = context.len(),
            "generating answer"
        );

        tokio::time::timeout(
            self.completion_timeout,
            self.completion.complete(query.trim(), &context),
        )
        .await
        .map_err(|_| DomainError::Timeout {
            operation: format!("{} completion", self.completion.name()),
            secs: self.completion_timeout.as_secs(),
        })?
    }
}
