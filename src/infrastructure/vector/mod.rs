//! Vector infrastructure components
//!
//! Provides the in-memory vector index with its snapshot persistence, and
//! token-aware text chunking for the ingestion pipeline.

pub mod chunker;
pub mod index;

pub use chunker::TokenChunker;
pub use index::{shared, IndexStats, PendingSnapshot, SharedIndex, VectorIndex};
