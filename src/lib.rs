//! lexrag - PDF ingestion and retrieval-augmented question answering
//!
//! Uploaded PDFs are staged, then a single background worker extracts their
//! text, splits it into token-bounded chunks, embeds the chunks and merges
//! them into a persistent vector index. Queries embed the question, scan the
//! index for the closest chunks and ask a language model to answer from them.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the ports for external collaborators
//! - **Service Layer** (`services`): upload gate, ingestion queue and worker, retrieval
//! - **Infrastructure Layer** (`infrastructure`): vector index, staging, config, logging
//! - **Adapters** (`adapters`): PDF extraction, embedding and completion APIs, HTTP
//! - **Application Layer** (`application`): wiring and process lifecycle
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use lexrag::application::Application;
//! use lexrag::infrastructure::config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     Application::build(config).await?.run(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{Application, Ports, RunningApplication};
pub use domain::models::{
    Chunk, Config, IngestionJob, IngestionStage, JobRecord, JobStatus, LoggingConfig, SearchHit,
};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::vector::{SharedIndex, VectorIndex};
pub use services::{IngestionQueue, RetrievalService, UploadGate, UploadOutcome};
