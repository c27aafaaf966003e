//! Chunk domain models
//!
//! A chunk is the atomic unit stored in the vector index: a bounded span of
//! document text, its metadata, and (once embedded) its vector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String metadata attached to a chunk.
pub type ChunkMetadata = BTreeMap<String, String>;

/// Well-known metadata keys written by the ingestion pipeline.
pub mod metadata_keys {
    /// Original name of the uploaded document.
    pub const FILE_NAME: &str = "file_name";
    /// 1-based page the chunk was extracted from.
    pub const PAGE_NUMBER: &str = "page_number";
    /// 0-based position of the chunk within its page.
    pub const CHUNK_INDEX: &str = "chunk_index";
    /// Number of tokens in the chunk text.
    pub const TOKEN_COUNT: &str = "token_count";
}

/// A chunk of document text, optionally carrying its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Globally unique identifier
    pub id: String,

    /// The text content of this chunk
    pub text: String,

    /// Metadata about this chunk
    #[serde(default)]
    pub metadata: ChunkMetadata,

    /// Embedding vector, absent until the chunk has been embedded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

impl Chunk {
    /// Create a new, not yet embedded chunk for a page of a document.
    ///
    /// The id is derived from the document name, page and position so
    /// re-ingesting the same document overwrites its chunks instead of
    /// duplicating them.
    pub fn new(
        document_name: &str,
        page_number: usize,
        chunk_index: usize,
        text: String,
        token_count: usize,
    ) -> Self {
        let mut metadata = ChunkMetadata::new();
        metadata.insert(metadata_keys::FILE_NAME.to_string(), document_name.to_string());
        metadata.insert(metadata_keys::PAGE_NUMBER.to_string(), page_number.to_string());
        metadata.insert(metadata_keys::CHUNK_INDEX.to_string(), chunk_index.to_string());
        metadata.insert(metadata_keys::TOKEN_COUNT.to_string(), token_count.to_string());

        Self {
            id: Self::chunk_id(document_name, page_number, chunk_index),
            text,
            metadata,
            vector: None,
        }
    }

    /// Deterministic chunk id: `{document}:p{page}:c{index}`.
    pub fn chunk_id(document_name: &str, page_number: usize, chunk_index: usize) -> String {
        format!("{document_name}:p{page_number}:c{chunk_index}")
    }

    /// Attach an embedding vector.
    #[must_use]
    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    /// Returns true once the chunk carries a vector.
    pub fn is_embedded(&self) -> bool {
        self.vector.is_some()
    }

    /// Name of the document this chunk came from, if recorded.
    pub fn document_name(&self) -> Option<&str> {
        self.metadata
            .get(metadata_keys::FILE_NAME)
            .map(String::as_str)
    }

    /// Get a preview of the content (first 100 chars)
    pub fn preview(&self) -> String {
        match self.text.char_indices().nth(100) {
            Some((idx, _)) => format!("{}...", &self.text[..idx]),
            None => self.text.clone(),
        }
    }
}

/// Text extracted from a single page of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number
    pub page_number: usize,
    /// Extracted text
    pub text: String,
}

impl PageText {
    pub fn new(page_number: usize, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }
}

/// A piece of text produced by a chunking service, before it becomes a [`Chunk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub text: String,
    pub token_count: usize,
}

/// A search result from the vector index.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// The matching chunk
    pub chunk: Chunk,
    /// Similarity score (cosine, higher is closer)
    pub score: f32,
}
