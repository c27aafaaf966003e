//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces that adapters implement for the
//! collaborators the pipeline treats as external:
//! - EmbeddingProvider: text to vector
//! - DocumentExtractor: document bytes to page text
//! - ChunkingService: page text to bounded segments
//! - CompletionProvider: question plus context to answer

pub mod chunking;
pub mod completion;
pub mod embedding;
pub mod extraction;

pub use chunking::ChunkingService;
pub use completion::CompletionProvider;
pub use embedding::{EmbeddingInput, EmbeddingOutput, EmbeddingProvider};
pub use extraction::DocumentExtractor;
