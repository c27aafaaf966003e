use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for lexrag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Staging area and index file locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Token chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Completion (answer generation) provider configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Ingestion pipeline configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Copy of the configuration with API keys masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.embedding.api_key.is_some() {
            config.embedding.api_key = Some("***".to_string());
        }
        if config.completion.api_key.is_some() {
            config.completion.api_key = Some("***".to_string());
        }
        config
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted upload body in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8080
}

const fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

const fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            enable_cors: default_true(),
        }
    }
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    /// Directory where uploaded documents are staged
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Path of the persisted vector index snapshot
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Move a malformed snapshot aside and start empty instead of failing startup
    #[serde(default)]
    pub quarantine_corrupt_index: bool,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("data/upload")
}

fn default_index_path() -> PathBuf {
    PathBuf::from("data/vector/vector-store.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            index_path: default_index_path(),
            quarantine_corrupt_index: false,
        }
    }
}

/// Configuration for token chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChunkingConfig {
    /// Maximum size of each chunk in tokens
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in tokens
    #[serde(default)]
    pub chunk_overlap: usize,

    /// A chunk is only cut back to a sentence boundary past this many characters
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    /// Chunks shorter than this (trimmed, in characters) are discarded
    #[serde(default = "default_min_chunk_len_to_embed")]
    pub min_chunk_len_to_embed: usize,

    /// Upper bound on chunks produced per page
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
}

const fn default_chunk_size() -> usize {
    800
}

const fn default_min_chunk_chars() -> usize {
    350
}

const fn default_min_chunk_len_to_embed() -> usize {
    5
}

const fn default_max_chunks() -> usize {
    10_000
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: 0,
            min_chunk_chars: default_min_chunk_chars(),
            min_chunk_len_to_embed: default_min_chunk_len_to_embed(),
            max_chunks: default_max_chunks(),
        }
    }
}

impl ChunkingConfig {
    /// Validate the chunking configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err("chunk_overlap must be less than chunk_size".to_string());
        }

        if self.max_chunks == 0 {
            return Err("max_chunks must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// OpenAI-compatible `/embeddings` endpoint
    OpenAi,
    /// Local deterministic feature hashing, no network
    Hashing,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingProviderKind,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Falls back to `OPENAI_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// Fixed vector dimension produced by the model
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Maximum texts per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Timeout applied to each embedding call
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_embedding_provider() -> EmbeddingProviderKind {
    EmbeddingProviderKind::OpenAi
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

const fn default_dimension() -> usize {
    1536
}

const fn default_batch_size() -> usize {
    64
}

const fn default_embedding_timeout_secs() -> u64 {
    60
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            base_url: default_openai_base_url(),
            api_key: None,
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

/// Which completion backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionProviderKind {
    /// OpenAI-compatible `/chat/completions` endpoint
    OpenAi,
    /// Answer with the retrieved passages verbatim
    Extractive,
}

/// Completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompletionConfig {
    #[serde(default = "default_completion_provider")]
    pub provider: CompletionProviderKind,

    #[serde(default = "default_completion_model")]
    pub model: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Falls back to `OPENAI_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_completion_provider() -> CompletionProviderKind {
    CompletionProviderKind::OpenAi
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_temperature() -> f32 {
    0.2
}

const fn default_max_tokens() -> u32 {
    1024
}

const fn default_completion_timeout_secs() -> u64 {
    60
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_completion_provider(),
            model: default_completion_model(),
            base_url: default_openai_base_url(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IngestionConfig {
    /// Timeout for extracting text from one document
    #[serde(default = "default_extraction_timeout_secs")]
    pub extraction_timeout_secs: u64,

    /// Enqueue staged documents missing from the index at startup
    #[serde(default = "default_true")]
    pub resume_on_startup: bool,
}

const fn default_extraction_timeout_secs() -> u64 {
    120
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            extraction_timeout_secs: default_extraction_timeout_secs(),
            resume_on_startup: default_true(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// Number of chunks used as answer context
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Largest `top_k` a caller may request
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Hits scoring below this are dropped
    #[serde(default)]
    pub similarity_threshold: f32,
}

const fn default_top_k() -> usize {
    4
}

const fn default_max_top_k() -> usize {
    20
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            similarity_threshold: 0.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Directory for log files (optional, if None logs only to stdout)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Enable stdout logging
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Log rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            enable_stdout: true,
            rotation: RotationPolicy::default(),
        }
    }
}
