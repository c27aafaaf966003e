//! Embedding provider adapters.

pub mod hashing;
pub mod openai;

use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{EmbeddingConfig, EmbeddingProviderKind};
use crate::domain::ports::EmbeddingProvider;

pub use hashing::HashingEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;

/// Build the embedding provider selected by configuration.
pub fn from_config(config: &EmbeddingConfig) -> DomainResult<Arc<dyn EmbeddingProvider>> {
    Ok(match config.provider {
        EmbeddingProviderKind::OpenAi => Arc::new(OpenAiEmbeddingProvider::new(config)?),
        EmbeddingProviderKind::Hashing => Arc::new(HashingEmbeddingProvider::new(config.dimension)?),
    })
}
