//! OpenAI chat completions adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{build_prompt, SYSTEM_PROMPT};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::CompletionConfig;
use crate::domain::ports::CompletionProvider;

/// Answers questions through an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompletionProvider {
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompletionProvider {
    pub fn new(config: &CompletionConfig) -> DomainResult<Self> {
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
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, question: &str, context: &[String]) -> DomainResult<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            DomainError::CompletionFailed(
                "OpenAI API key not set. Set OPENAI_API_KEY or completion.api_key.".to_string(),
            )
        })?;

        let prompt = build_prompt(question, context);
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::CompletionFailed(format!("Chat completion request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(DomainError::CompletionFailed(format!(
                "Chat completion returned {status}: {text}"
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            DomainError::CompletionFailed(format!("Failed to parse chat completion: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| DomainError::CompletionFailed("Chat completion was empty".to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
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
