//! Text chunking service implementation
//!
//! Provides token-aware text chunking using tiktoken for optimal embedding quality.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ChunkingConfig, TextSegment};
use crate::domain::ports::ChunkingService;
use tiktoken_rs::CoreBPE;

/// Sentence boundaries a chunk may be cut back to.
const BOUNDARIES: [char; 4] = ['.', '!', '?', '\n'];

/// Token-aware text chunking service
///
/// Splits text into windows of `chunk_size` tokens. A window that is not the
/// last one is cut back to its final sentence boundary when that boundary lies
/// past `min_chunk_chars`. The next window re-encodes the text from the end
/// of the kept part, stepped back by `chunk_overlap` tokens. Segments shorter than `min_chunk_len_to_embed` are discarded.
pub struct TokenChunker {
    config: ChunkingConfig,
    tokenizer: CoreBPE,
}

impl TokenChunker {
    /// Create a new chunker with default configuration
    pub fn new() -> DomainResult<Self> {
        Self::with_config(ChunkingConfig::default())
    }

    /// Create a new chunker with custom configuration
    pub fn with_config(config: ChunkingConfig) -> DomainResult<Self> {
        config
            .validate()
            .map_err(|e| DomainError::ValidationFailed(format!("Invalid chunking config: {e}")))?;

        // cl100k_base is the tokenizer used by GPT-4 and the OpenAI embedding models
        let tokenizer = tiktoken_rs::cl100k_base().map_err(|e| {
            DomainError::ExecutionFailed(format!("Failed to load tokenizer: {e}"))
        })?;

        Ok(Self { config, tokenizer })
    }

    fn split_impl(&self, text: &str) -> DomainResult<Vec<TextSegment>> {
        let mut segments = Vec::new();
        // Byte offset into `text`; always a char boundary
        let mut offset = 0;

        while offset < text.len() && segments.len() < self.config.max_chunks {
            let rest = &text[offset..];
            let tokens = self.tokenizer.encode_with_special_tokens(rest);
            if tokens.is_empty() {
                break;
            }

            let end = self.config.chunk_size.min(tokens.len());
            let (window_text, window_end) = self.decode_prefix(&tokens, end)?;
            let is_last = window_end >= tokens.len();

            let kept = if is_last {
                window_text
            } else {
                self.snap_to_boundary(&window_text)
                    .unwrap_or(window_text)
            };

            let trimmed = kept.trim();
            if trimmed.chars().count() > self.config.min_chunk_len_to_embed {
                segments.push(TextSegment {
                    text: trimmed.to_string(),
                    token_count: self.count_tokens(trimmed),
                });
            }

            if is_last {
                break;
            }

            offset += self.advance_past(&kept)?;
        }

        Ok(segments)
    }

    /// Bytes of `kept` to step over so the next window repeats its last
    /// `chunk_overlap` tokens. Never zero.
    fn advance_past(&self, kept: &str) -> DomainResult<usize> {
        let overlap = self.config.chunk_overlap;
        if overlap == 0 {
            return Ok(kept.len());
        }
        let tokens = self.tokenizer.encode_with_special_tokens(kept);
        if tokens.len() <= overlap {
            return Ok(kept.len());
        }
        // Decoded token prefixes are byte prefixes of `kept`
        let (head, _) = self.decode_prefix(&tokens, tokens.len() - overlap)?;
        Ok(if head.is_empty() { kept.len() } else { head.len() })
    }

    /// Decode `tokens[..end]`, shrinking `end` while it splits a multi-byte
    /// character.
    fn decode_prefix(&self, tokens: &[u32], end: usize) -> DomainResult<(String, usize)> {
        let mut prefix_end = end;
        loop {
            match self.tokenizer.decode(tokens[..prefix_end].to_vec()) {
                Ok(text) => return Ok((text, prefix_end)),
                Err(_) if prefix_end > 1 && end - prefix_end < 4 => prefix_end -= 1,
                Err(e) => {
                    return Err(DomainError::ExecutionFailed(format!(
                        "Failed to decode tokens: {e}"
                    )))
                }
            }
        }
    }

    /// Cut text back to its last sentence boundary, if that boundary lies past
    /// `min_chunk_chars`.
    fn snap_to_boundary(&self, text: &str) -> Option<String> {
        let (pos, c) = text
            .char_indices()
            .rev()
            .find(|(_, c)| BOUNDARIES.contains(c))?;

        if text[..pos].chars().count() > self.config.min_chunk_chars {
            Some(text[..pos + c.len_utf8()].to_string())
        } else {
            None
        }
    }
}

impl ChunkingService for TokenChunker {
    fn split(&self, text: &str) -> DomainResult<Vec<TextSegment>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.split_impl(text)
    }

    fn count_tokens(&self, text: &str) -> usize {
        self.tokenizer.encode_with_special_tokens(text).len()
    }
}
