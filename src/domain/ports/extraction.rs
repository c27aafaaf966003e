//! Document text extraction port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::PageText;

/// Extracts page-scoped text from raw document bytes.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Extractor name for diagnostics.
    fn name(&self) -> &'static str;

    /// Extract the text of every page, in page order.
    ///
    /// Fails with `DomainError::ExtractionFailed` on unreadable or
    /// structurally invalid content.
    async fn extract(&self, bytes: Vec<u8>) -> DomainResult<Vec<PageText>>;
}
