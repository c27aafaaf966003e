pub mod chunk;
pub mod config;
pub mod job;

pub use chunk::{metadata_keys, Chunk, ChunkMetadata, PageText, SearchHit, TextSegment};
pub use config::{
    ChunkingConfig, CompletionConfig, CompletionProviderKind, Config, EmbeddingConfig,
    EmbeddingProviderKind, IngestionConfig, LogFormat, LoggingConfig, RetrievalConfig,
    RotationPolicy, ServerConfig, StorageConfig,
};
pub use job::{IngestionJob, IngestionStage, JobRecord, JobStatus};
