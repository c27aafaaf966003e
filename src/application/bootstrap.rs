//! Process bootstrap: builds the pipeline from configuration and runs it.
//!
//! The vector index is constructed once here and handed to the worker and
//! the retrieval service; nothing else owns it.

use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::http::{build_router, AppState, HttpServer};
use crate::adapters::{completion, embeddings, pdf::PdfExtractor};
use crate::domain::models::Config;
use crate::domain::ports::{ChunkingService, CompletionProvider, DocumentExtractor, EmbeddingProvider};
use crate::infrastructure::storage::StagingArea;
use crate::infrastructure::vector::{shared, SharedIndex, TokenChunker, VectorIndex};
use crate::services::{
    EmbeddingService, IngestionQueue, IngestionWorker, IngestionWorkerDeps, RetrievalService,
    UploadGate, WorkerHandle,
};

/// External collaborators of the pipeline.
pub struct Ports {
    pub extractor: Arc<dyn DocumentExtractor>,
    pub chunker: Arc<dyn ChunkingService>,
    pub embedding: Arc<dyn EmbeddingProvider>,
    pub completion: Arc<dyn CompletionProvider>,
}

impl Ports {
    /// Adapters selected by configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            extractor: Arc::new(PdfExtractor::new()),
            chunker: Arc::new(
                TokenChunker::with_config(config.chunking.clone())
                    .context("Failed to build token chunker")?,
            ),
            embedding: embeddings::from_config(&config.embedding)
                .context("Failed to build embedding provider")?,
            completion: completion::from_config(&config.completion)
                .context("Failed to build completion provider")?,
        })
    }
}

/// A fully wired pipeline whose worker has not started yet.
pub struct Application {
    config: Config,
    state: Arc<AppState>,
    index: SharedIndex,
    worker: IngestionWorker,
}

impl Application {
    /// Build the pipeline with the adapters named in `config`.
    pub async fn build(config: Config) -> Result<Self> {
        let ports = Ports::from_config(&config)?;
        Self::build_with(config, ports).await
    }

    /// Build the pipeline around the given collaborators.
    ///
    /// Creates the staging and index directories and loads the persisted
    /// index. A corrupt snapshot is fatal unless quarantine is enabled.
    pub async fn build_with(config: Config, ports: Ports) -> Result<Self> {
        let storage = &config.storage;
        let staging = StagingArea::new(&storage.upload_dir);
        staging
            .ensure_dirs()
            .await
            .with_context(|| format!("Failed to create {}", storage.upload_dir.display()))?;
        if let Some(parent) = storage.index_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let index_path = storage.index_path.clone();
        let quarantine = storage.quarantine_corrupt_index;
        let loaded = tokio::task::spawn_blocking(move || {
            VectorIndex::load_or_quarantine(&index_path, quarantine)
        })
        .await
        .context("Index loading task failed")?
        .with_context(|| format!("Failed to load index {}", storage.index_path.display()))?;

        if let Some(dimension) = loaded.dimension() {
            if dimension != ports.embedding.dimension() {
                anyhow::bail!(
                    "Index {} holds {dimension}-dimensional vectors but the {} embedding provider produces {}",
                    storage.index_path.display(),
                    ports.embedding.name(),
                    ports.embedding.dimension()
                );
            }
        }

        let stats = loaded.stats();
        tracing::info!(
            path = %storage.index_path.display(),
            chunks = stats.chunks,
            documents = stats.documents.len(),
            "vector index loaded"
        );
        let index = shared(loaded);

        let embedding_service = Arc::new(EmbeddingService::new(
            ports.embedding,
            Duration::from_secs(config.embedding.timeout_secs),
        ));
        let (queue, receiver) = IngestionQueue::new();

        let worker = IngestionWorker::new(
            IngestionWorkerDeps {
                queue: queue.clone(),
                staging: staging.clone(),
                extractor: ports.extractor,
                chunker: ports.chunker,
                embeddings: embedding_service.clone(),
                index: index.clone(),
                index_path: storage.index_path.clone(),
                extraction_timeout: Duration::from_secs(config.ingestion.extraction_timeout_secs),
            },
            receiver,
        );

        let retrieval = Arc::new(RetrievalService::new(
            index.clone(),
            embedding_service,
            ports.completion,
            config.retrieval.clone(),
            Duration::from_secs(config.completion.timeout_secs),
        ));
        let upload_gate = Arc::new(UploadGate::new(staging, queue.clone()));

        let state = Arc::new(AppState {
            upload_gate,
            queue,
            retrieval,
        });

        Ok(Self {
            config,
            state,
            index,
            worker,
        })
    }

    pub fn index(&self) -> SharedIndex {
        self.index.clone()
    }

    /// Start the worker and, if configured, requeue stranded documents.
    pub async fn start(self) -> Result<RunningApplication> {
        let worker = self.worker.spawn();

        if self.config.ingestion.resume_on_startup {
            let resumed = {
                let index = self.index.read().await;
                self.state.upload_gate.requeue_unindexed(&index).await
            };
            match resumed {
                Ok(ids) if !ids.is_empty() => {
                    tracing::info!(jobs = ids.len(), "resumed ingestion of staged documents");
                }
                Ok(_) => {}
                Err(err) => {
                    worker.shutdown().await;
                    return Err(err).context("Failed to resume staged documents");
                }
            }
        }

        Ok(RunningApplication {
            config: self.config,
            state: self.state,
            index: self.index,
            worker,
        })
    }

    /// Run until `shutdown` resolves: serve HTTP, then stop the worker
    /// after its current job.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let running = self.start().await?;
        let server = HttpServer::new(running.state.clone(), running.config.server.clone());

        let served = server.serve_with_shutdown(shutdown).await;
        running.shutdown().await;
        served.context("HTTP server failed")
    }
}

/// A pipeline with its worker running.
pub struct RunningApplication {
    config: Config,
    state: Arc<AppState>,
    index: SharedIndex,
    worker: WorkerHandle,
}

impl RunningApplication {
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    pub fn index(&self) -> SharedIndex {
        self.index.clone()
    }

    /// Router serving this pipeline.
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &self.config.server)
    }

    /// Stop the worker once the job in progress finishes.
    pub async fn shutdown(self) {
        let pending = self.state.queue.pending_count().await;
        self.worker.shutdown().await;
        tracing::info!(pending, "ingestion stopped; pending documents stay staged");
    }
}
