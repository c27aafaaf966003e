//! Ingestion worker: the only writer of the vector index.
//!
//! A single task drains the [`JobReceiver`] and runs each job through
//! `Extracting -> Chunking -> Embedding -> Merging -> Persisting -> Done`
//! before taking the next one, so two jobs never interleave their index
//! mutations. Any stage error moves the job to `Failed`; nothing is retried.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Chunk, IngestionJob, IngestionStage, PageText};
use crate::domain::ports::{ChunkingService, DocumentExtractor};
use crate::infrastructure::storage::StagingArea;
use crate::infrastructure::vector::{SharedIndex, VectorIndex};
use crate::services::embedding_service::EmbeddingService;
use crate::services::ingestion_queue::{IngestionQueue, JobReceiver};

/// Collaborators and settings of the ingestion worker.
pub struct IngestionWorkerDeps {
    pub queue: Arc<IngestionQueue>,
    pub staging: StagingArea,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub chunker: Arc<dyn ChunkingService>,
    pub embeddings: Arc<EmbeddingService>,
    pub index: SharedIndex,
    pub index_path: PathBuf,
    pub extraction_timeout: Duration,
}

/// Handle to stop a spawned worker.
pub struct WorkerHandle {
    stop_flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Request the worker to stop after the job in progress.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Stop the worker and wait for it to exit.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "ingestion worker task panicked");
        }
    }
}

/// The ingestion state machine driver.
pub struct IngestionWorker {
    deps: IngestionWorkerDeps,
    receiver: JobReceiver,
}

impl IngestionWorker {
    pub fn new(deps: IngestionWorkerDeps, receiver: JobReceiver) -> Self {
        Self { deps, receiver }
    }

    /// Run the worker loop on its own task.
    pub fn spawn(self) -> WorkerHandle {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        let task = tokio::spawn(self.run(stop_flag.clone(), wake.clone()));
        WorkerHandle {
            stop_flag,
            wake,
            task,
        }
    }

    async fn run(mut self, stop_flag: Arc<AtomicBool>, wake: Arc<Notify>) {
        tracing::info!("ingestion worker started");

        while !stop_flag.load(Ordering::Acquire) {
            let job = tokio::select! {
                () = wake.notified() => continue,
                job = self.receiver.recv() => job,
            };
            let Some(job) = job else {
                break;
            };
            // Not cancelled by stop; the job always reaches Done or Failed
            self.process(job).await;
        }

        let pending = self.deps.queue.pending_count().await;
        tracing::info!(pending, "ingestion worker stopped");
    }

    /// Take one job through every stage and record the outcome.
    pub async fn process(&self, job: IngestionJob) {
        let started = Instant::now();
        let job_id = job.id;
        let document = job.document_name.clone();

        if let Err(err) = self.deps.queue.mark_running(job_id).await {
            tracing::error!(job_id = %job_id, document = %document, error = %err, "cannot start ingestion job");
            return;
        }
        tracing::info!(job_id = %job_id, document = %document, "ingestion started");

        let mut stage = IngestionStage::Extracting;
        let outcome = self.run_stages(&job, &mut stage).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let recorded = match outcome {
            Ok(chunks) => {
                tracing::info!(
                    job_id = %job_id,
                    document = %document,
                    chunks,
                    elapsed_ms,
                    "ingestion succeeded"
                );
                self.deps.queue.mark_succeeded(job_id, chunks).await
            }
            Err(err) => {
                tracing::error!(
                    job_id = %job_id,
                    document = %document,
                    stage = %stage,
                    error = %err,
                    elapsed_ms,
                    "ingestion failed"
                );
                self.deps
                    .queue
                    .mark_failed(job_id, format!("{stage}: {err}"))
                    .await
            }
        };
        if let Err(err) = recorded {
            tracing::error!(job_id = %job_id, error = %err, "failed to record job outcome");
        }
    }

    async fn run_stages(
        &self,
        job: &IngestionJob,
        stage: &mut IngestionStage,
    ) -> DomainResult<usize> {
        self.enter(job, *stage).await;
        let pages = self.extract(job).await?;
        self.leave(job, *stage, pages.len());

        self.advance(job, stage, IngestionStage::Chunking).await?;
        let chunks = self.chunk(job, pages).await?;
        self.leave(job, *stage, chunks.len());

        self.advance(job, stage, IngestionStage::Embedding).await?;
        let chunks = self.deps.embeddings.embed_chunks(chunks).await?;
        let count = chunks.len();
        self.leave(job, *stage, count);

        // Held through Persisting so searches never see a state that is not on disk
        let mut index = self.deps.index.write().await;

        self.advance(job, stage, IngestionStage::Merging).await?;
        let path = self.deps.index_path.clone();
        let merged = blocking(move || {
            let mut next = VectorIndex::load(&path)?;
            next.add(chunks)?;
            Ok(next)
        })
        .await?;
        self.leave(job, *stage, merged.len());

        self.advance(job, stage, IngestionStage::Persisting).await?;
        let path = self.deps.index_path.clone();
        let merged = blocking(move || {
            merged.persist(&path)?;
            Ok(merged)
        })
        .await?;
        *index = merged;
        drop(index);
        self.leave(job, *stage, count);

        self.advance(job, stage, IngestionStage::Done).await?;
        Ok(count)
    }

    async fn extract(&self, job: &IngestionJob) -> DomainResult<Vec<PageText>> {
        let bytes = self.deps.staging.read(&job.staged_path).await?;
        let timeout = self.deps.extraction_timeout;

        let pages = tokio::time::timeout(timeout, self.deps.extractor.extract(bytes))
            .await
            .map_err(|_| DomainError::Timeout {
                operation: format!("{} extraction", self.deps.extractor.name()),
                secs: timeout.as_secs(),
            })??;

        if pages.iter().all(|page| page.text.trim().is_empty()) {
            return Err(DomainError::ExtractionFailed(
                "document contains no extractable text".to_string(),
            ));
        }
        Ok(pages)
    }

    async fn chunk(&self, job: &IngestionJob, pages: Vec<PageText>) -> DomainResult<Vec<Chunk>> {
        let chunker = Arc::clone(&self.deps.chunker);
        let document = job.document_name.clone();

        let chunks = blocking(move || {
            let mut chunks = Vec::new();
            for page in pages {
                let segments = chunker.split(&page.text)?;
                chunks.extend(segments.into_iter().enumerate().map(|(i, segment)| {
                    Chunk::new(&document, page.page_number, i, segment.text, segment.token_count)
                }));
            }
            Ok(chunks)
        })
        .await?;

        if chunks.is_empty() {
            return Err(DomainError::ExtractionFailed(
                "document text produced no chunks".to_string(),
            ));
        }
        Ok(chunks)
    }

    async fn advance(
        &self,
        job: &IngestionJob,
        stage: &mut IngestionStage,
        to: IngestionStage,
    ) -> DomainResult<()> {
        *stage = stage.transition(to)?;
        self.enter(job, *stage).await;
        Ok(())
    }

    async fn enter(&self, job: &IngestionJob, stage: IngestionStage) {
        tracing::debug!(job_id = %job.id, document = %job.document_name, stage = %stage, "entering stage");
        if let Err(err) = self.deps.queue.set_stage(job.id, stage).await {
            tracing::warn!(job_id = %job.id, error = %err, "failed to record stage");
        }
    }

    fn leave(&self, job: &IngestionJob, stage: IngestionStage, items: usize) {
        tracing::debug!(job_id = %job.id, document = %job.document_name, stage = %stage, items, "leaving stage");
    }
}

/// Run blocking file or CPU work off the async runtime.
async fn blocking<T, F>(work: F) -> DomainResult<T>
where
    F: FnOnce() -> DomainResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DomainError::ExecutionFailed(format!("blocking task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::embeddings::HashingEmbeddingProvider;
    use crate::domain::models::{ChunkingConfig, JobStatus};
    use crate::infrastructure::vector::{shared, TokenChunker};
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Treats bytes as UTF-8 text with form feeds between pages.
    struct PlainTextExtractor;

    #[async_trait]
    impl DocumentExtractor for PlainTextExtractor {
        fn name(&self) -> &'static str {
            "plain-text"
        }

        async fn extract(&self, bytes: Vec<u8>) -> DomainResult<Vec<PageText>> {
            let text = String::from_utf8(bytes)
                .map_err(|e| DomainError::ExtractionFailed(e.to_string()))?;
            Ok(text
                .split('\x0C')
                .enumerate()
                .map(|(i, page)| PageText::new(i + 1, page))
                .collect())
        }
    }

    struct HangingExtractor;

    #[async_trait]
    impl DocumentExtractor for HangingExtractor {
        fn name(&self) -> &'static str {
            "hanging"
        }

        async fn extract(&self, _bytes: Vec<u8>) -> DomainResult<Vec<PageText>> {
            std::future::pending().await
        }
    }

    struct Fixture {
        _dir: TempDir,
        worker: IngestionWorker,
        queue: Arc<IngestionQueue>,
        staging: StagingArea,
        index: SharedIndex,
        index_path: PathBuf,
    }

    async fn fixture(extractor: Arc<dyn DocumentExtractor>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(dir.path().join("upload"));
        staging.ensure_dirs().await.unwrap();
        let index_path = dir.path().join("vector").join("index.json");
        std::fs::create_dir_all(index_path.parent().unwrap()).unwrap();

        let (queue, receiver) = IngestionQueue::new();
        let index = shared(VectorIndex::new());
        let chunker = TokenChunker::with_config(ChunkingConfig {
            chunk_size: 40,
            min_chunk_chars: 20,
            ..ChunkingConfig::default()
        })
        .unwrap();

        let deps = IngestionWorkerDeps {
            queue: queue.clone(),
            staging: staging.clone(),
            extractor,
            chunker: Arc::new(chunker),
            embeddings: Arc::new(EmbeddingService::new(
                Arc::new(HashingEmbeddingProvider::new(32).unwrap()),
                Duration::from_secs(5),
            )),
            index: index.clone(),
            index_path: index_path.clone(),
            extraction_timeout: Duration::from_millis(200),
        };

        Fixture {
            _dir: dir,
            worker: IngestionWorker::new(deps, receiver),
            queue,
            staging,
            index,
            index_path,
        }
    }

    async fn stage(fx: &Fixture, name: &str, body: &str) -> IngestionJob {
        let path = fx.staging.write(name, body.as_bytes()).await.unwrap();
        let job = IngestionJob::new(name, path);
        fx.queue.enqueue(job.clone()).await.unwrap();
        job
    }

    #[tokio::test]
    async fn test_process_indexes_and_persists() {
        let fx = fixture(Arc::new(PlainTextExtractor)).await;
        let job = stage(
            &fx,
            "contract.pdf",
            "The buyer pays within thirty days.\x0CThe seller delivers the goods.",
        )
        .await;

        fx.worker.process(job.clone()).await;

        let record = fx.queue.get(job.id).await.unwrap();
        assert_eq!(record.status(), JobStatus::Succeeded, "{:?}", record.error);
        assert_eq!(record.stage, Some(IngestionStage::Done));
        assert_eq!(record.chunks_indexed, 2);

        let index = fx.index.read().await;
        assert!(index.contains("contract.pdf:p1:c0"));
        assert!(index.contains("contract.pdf:p2:c0"));

        let on_disk = VectorIndex::load(&fx.index_path).unwrap();
        assert_eq!(on_disk.len(), 2);
    }

    #[tokio::test]
    async fn test_second_document_merges_with_first() {
        let fx = fixture(Arc::new(PlainTextExtractor)).await;
        let first = stage(&fx, "a.pdf", "Alpha clause text here.").await;
        let second = stage(&fx, "b.pdf", "Beta clause text here.").await;

        fx.worker.process(first).await;
        fx.worker.process(second).await;

        let on_disk = VectorIndex::load(&fx.index_path).unwrap();
        let documents: Vec<_> = on_disk.document_names().into_iter().collect();
        assert_eq!(documents, vec!["a.pdf".to_string(), "b.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_search_waits_for_merge_and_sees_persisted_state() {
        let fx = fixture(Arc::new(PlainTextExtractor)).await;
        let first = stage(&fx, "a.pdf", "Alpha clause text here.").await;
        fx.worker.process(first).await;
        let second = stage(&fx, "b.pdf", "Beta clause text here.").await;

        // A search already in flight when the job reaches Merging
        let in_flight = fx.index.read().await;
        let index = fx.index.clone();
        let index_path = fx.index_path.clone();

        let observer = async move {
            let deadline = Instant::now() + Duration::from_secs(5);
            // Once the worker queues for the write lock, new readers wait behind it
            while let Ok(guard) = index.try_read() {
                drop(guard);
                assert!(Instant::now() < deadline, "worker never asked for the write lock");
                tokio::time::sleep(Duration::from_millis(5)).await;
            }

            let search = tokio::spawn({
                let index = index.clone();
                async move { index.read().await.document_names() }
            });
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(!search.is_finished());

            let before = in_flight.document_names();
            drop(in_flight);
            let after = search.await.unwrap();
            let on_disk = VectorIndex::load(&index_path).unwrap().document_names();
            (before, after, on_disk)
        };

        let ((before, after, on_disk), ()) = tokio::join!(observer, fx.worker.process(second));

        assert_eq!(before.into_iter().collect::<Vec<_>>(), vec!["a.pdf".to_string()]);
        assert_eq!(
            after.iter().cloned().collect::<Vec<_>>(),
            vec!["a.pdf".to_string(), "b.pdf".to_string()]
        );
        assert_eq!(after, on_disk);
    }

    #[tokio::test]
    async fn test_empty_document_fails_at_extraction() {
        let fx = fixture(Arc::new(PlainTextExtractor)).await;
        let job = stage(&fx, "blank.pdf", "   \x0C  ").await;

        fx.worker.process(job.clone()).await;

        let record = fx.queue.get(job.id).await.unwrap();
        assert_eq!(record.status(), JobStatus::Failed);
        assert!(record.error.unwrap().starts_with("extracting"));
        assert!(!fx.index_path.exists());
    }

    #[tokio::test]
    async fn test_hanging_extractor_times_out() {
        let fx = fixture(Arc::new(HangingExtractor)).await;
        let job = stage(&fx, "slow.pdf", "anything").await;

        fx.worker.process(job.clone()).await;

        let record = fx.queue.get(job.id).await.unwrap();
        assert_eq!(record.status(), JobStatus::Failed);
        assert!(record.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_fails_merge_and_is_left_alone() {
        let fx = fixture(Arc::new(PlainTextExtractor)).await;
        std::fs::write(&fx.index_path, b"{not json").unwrap();
        let job = stage(&fx, "a.pdf", "Alpha clause text here.").await;

        fx.worker.process(job.clone()).await;

        let record = fx.queue.get(job.id).await.unwrap();
        assert_eq!(record.status(), JobStatus::Failed);
        assert_eq!(record.stage, Some(IngestionStage::Failed));
        assert!(record.error.unwrap().starts_with("merging"));
        assert_eq!(std::fs::read(&fx.index_path).unwrap(), b"{not json");
        assert!(fx.index.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_spawned_worker_drains_queue_and_stops() {
        let fx = fixture(Arc::new(PlainTextExtractor)).await;
        let first = stage(&fx, "a.pdf", "Alpha clause text here.").await;
        let second = stage(&fx, "b.pdf", "Beta clause text here.").await;
        let Fixture { worker, queue, _dir, .. } = fx;

        let handle = worker.spawn();
        for _ in 0..200 {
            if queue.get(second.id).await.unwrap().status().is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.shutdown().await;

        assert_eq!(queue.get(first.id).await.unwrap().status(), JobStatus::Succeeded);
        assert_eq!(queue.get(second.id).await.unwrap().status(), JobStatus::Succeeded);
    }
}
