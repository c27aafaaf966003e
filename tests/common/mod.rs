//! Common test utilities for integration tests
//!
//! Provides a fully wired pipeline over temporary directories with local
//! collaborators: a plain-text "PDF" extractor, the hashing embedder and the
//! extractive answerer.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use lexrag::adapters::completion::ExtractiveCompletionProvider;
use lexrag::adapters::embeddings::HashingEmbeddingProvider;
use lexrag::domain::models::{
    ChunkingConfig, CompletionProviderKind, Config, EmbeddingProviderKind, JobRecord, PageText,
};
use lexrag::domain::ports::DocumentExtractor;
use lexrag::infrastructure::vector::TokenChunker;
use lexrag::services::IngestionQueue;
use lexrag::{Application, DomainError, DomainResult, Ports, RunningApplication};

/// Header of the stand-in PDF format understood by [`StubPdfExtractor`].
pub const STUB_PDF_HEADER: &str = "%PDF-1.4 stub\n";

/// Embedding dimension used by test pipelines.
pub const TEST_DIMENSION: usize = 64;

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Setup test logging
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Build stand-in PDF bytes: the header followed by pages separated by form feeds.
pub fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    format!("{STUB_PDF_HEADER}{}", pages.join("\x0C")).into_bytes()
}

/// Extracts pages from [`pdf_bytes`] output; anything else is not a PDF.
#[derive(Default)]
pub struct StubPdfExtractor {
    /// Number of upcoming calls that fail.
    pub failures_left: AtomicUsize,
}

impl StubPdfExtractor {
    pub fn failing(times: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(times),
        }
    }
}

#[async_trait]
impl DocumentExtractor for StubPdfExtractor {
    fn name(&self) -> &'static str {
        "stub-pdf"
    }

    async fn extract(&self, bytes: Vec<u8>) -> DomainResult<Vec<PageText>> {
        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(DomainError::ExtractionFailed("injected failure".to_string()));
        }

        let text = String::from_utf8(bytes)
            .map_err(|e| DomainError::ExtractionFailed(e.to_string()))?;
        let body = text
            .strip_prefix(STUB_PDF_HEADER)
            .ok_or_else(|| DomainError::ExtractionFailed("content is not a PDF document".to_string()))?;

        Ok(body
            .split('\x0C')
            .enumerate()
            .map(|(i, page)| PageText::new(i + 1, page))
            .collect())
    }
}

/// Configuration rooted in `dir` with local providers.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.upload_dir = dir.join("upload");
    config.storage.index_path = dir.join("vector").join("vector-store.json");
    config.embedding.provider = EmbeddingProviderKind::Hashing;
    config.embedding.dimension = TEST_DIMENSION;
    config.completion.provider = CompletionProviderKind::Extractive;
    config.chunking = ChunkingConfig {
        chunk_size: 60,
        min_chunk_chars: 40,
        ..ChunkingConfig::default()
    };
    config.ingestion.extraction_timeout_secs = 5;
    config
}

/// Local collaborators for `config`.
pub fn test_ports(config: &Config, extractor: StubPdfExtractor) -> Ports {
    Ports {
        extractor: Arc::new(extractor),
        chunker: Arc::new(TokenChunker::with_config(config.chunking.clone()).unwrap()),
        embedding: Arc::new(HashingEmbeddingProvider::new(config.embedding.dimension).unwrap()),
        completion: Arc::new(ExtractiveCompletionProvider::new()),
    }
}

/// Build and start a pipeline.
pub async fn start_app(config: Config) -> RunningApplication {
    start_app_with(config, StubPdfExtractor::default()).await
}

pub async fn start_app_with(config: Config, extractor: StubPdfExtractor) -> RunningApplication {
    let ports = test_ports(&config, extractor);
    Application::build_with(config, ports)
        .await
        .expect("application should build")
        .start()
        .await
        .expect("application should start")
}

/// Poll until the job is terminal, panicking after a few seconds.
pub async fn wait_for_job(queue: &IngestionQueue, id: Uuid) -> JobRecord {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let record = queue.get(id).await.expect("job should be registered");
        if record.status().is_terminal() {
            return record;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} did not finish, last stage {:?}",
            record.stage
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
