//! PDF text extraction adapter.
//!
//! Uses pdf-extract on a blocking thread, one string per page.

use async_trait::async_trait;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::PageText;
use crate::domain::ports::DocumentExtractor;

/// Magic bytes every PDF file starts with.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extracts page-scoped text from PDF bytes.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentExtractor for PdfExtractor {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    async fn extract(&self, bytes: Vec<u8>) -> DomainResult<Vec<PageText>> {
        ensure_pdf_header(&bytes)?;

        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| DomainError::ExtractionFailed(format!("PDF extraction aborted: {e}")))?
        .map_err(|e| DomainError::ExtractionFailed(format!("PDF extraction failed: {e}")))?;

        Ok(number_pages(pages))
    }
}

fn ensure_pdf_header(bytes: &[u8]) -> DomainResult<()> {
    // Some writers emit a few junk bytes before the header
    let head = &bytes[..bytes.len().min(1024)];
    if head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        Ok(())
    } else {
        Err(DomainError::ExtractionFailed(
            "content is not a PDF document".to_string(),
        ))
    }
}

/// Number extracted pages from 1, dropping pages without text.
fn number_pages(pages: Vec<String>) -> Vec<PageText> {
    pages
        .into_iter()
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| PageText::new(i + 1, page.trim()))
        .collect()
}
