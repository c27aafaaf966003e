//! Completion provider port for answer generation.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Generates an answer to a question, grounded on retrieved context passages.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name (e.g., "openai", "extractive").
    fn name(&self) -> &'static str;

    /// Answer `question` using only `context`.
    async fn complete(&self, question: &str, context: &[String]) -> DomainResult<String>;
}
