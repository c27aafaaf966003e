//! Completion provider adapters.

pub mod extractive;
pub mod openai;

use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CompletionConfig, CompletionProviderKind};
use crate::domain::ports::CompletionProvider;

pub use extractive::ExtractiveCompletionProvider;
pub use openai::OpenAiCompletionProvider;

/// Instructions sent ahead of every grounded question.
pub const SYSTEM_PROMPT: &str = "You answer questions about uploaded documents. \
Use only the context passages supplied with the question. \
If the context does not contain the answer, say that you cannot answer from the provided documents.";

/// Build the user message: delimited context passages followed by the question.
pub fn build_prompt(question: &str, context: &[String]) -> String {
    let mut prompt = String::from("Context information is below.\n---------------------\n");
    for passage in context {
        prompt.push_str(passage.trim());
        prompt.push_str("\n\n");
    }
    prompt.push_str("---------------------\nQuestion: ");
    prompt.push_str(question.trim());
    prompt
}

/// Build the completion provider selected by configuration.
pub fn from_config(config: &CompletionConfig) -> DomainResult<Arc<dyn CompletionProvider>> {
    Ok(match config.provider {
        CompletionProviderKind::OpenAi => Arc::new(OpenAiCompletionProvider::new(config)?),
        CompletionProviderKind::Extractive => Arc::new(ExtractiveCompletionProvider::new()),
    })
}
