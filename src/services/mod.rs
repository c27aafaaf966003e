//! Application services.
//!
//! The ingestion pipeline (upload gate, queue, worker) and the retrieval
//! side that reads the vector index.

pub mod embedding_service;
pub mod ingestion_queue;
pub mod ingestion_worker;
pub mod retrieval_service;
pub mod upload_gate;

pub use embedding_service::EmbeddingService;
pub use ingestion_queue::{IngestionQueue, JobReceiver};
pub use ingestion_worker::{IngestionWorker, IngestionWorkerDeps, WorkerHandle};
pub use retrieval_service::RetrievalService;
pub use upload_gate::{UploadGate, UploadOutcome, PDF_CONTENT_TYPE};
