//! Text chunking port.

use crate::domain::errors::DomainResult;
use crate::domain::models::TextSegment;

/// Splits text into bounded-size segments suitable for embedding.
///
/// Implementations must be deterministic: the same input always yields the
/// same segments.
pub trait ChunkingService: Send + Sync {
    /// Split `text` into segments.
    fn split(&self, text: &str) -> DomainResult<Vec<TextSegment>>;

    /// Count the tokens in `text`.
    fn count_tokens(&self, text: &str) -> usize;
}
