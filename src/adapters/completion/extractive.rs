//! Completion provider that answers with the retrieved passages themselves.
//!
//! Used when no language model is configured.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::ports::CompletionProvider;

/// Reply used when retrieval found nothing.
pub const NO_CONTEXT_ANSWER: &str = "I cannot answer that from the provided documents.";

#[derive(Debug, Clone, Default)]
pub struct ExtractiveCompletionProvider;

impl ExtractiveCompletionProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CompletionProvider for ExtractiveCompletionProvider {
    fn name(&self) -> &'static str {
        "extractive"
    }

    async fn complete(&self, _question: &str, context: &[String]) -> DomainResult<String> {
        let passages: Vec<&str> = context
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();

        if passages.is_empty() {
            return Ok(NO_CONTEXT_ANSWER.to_string());
        }
        Ok(passages.join("\n\n"))
    }
}
