//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lexrag")]
#[command(about = "lexrag - PDF ingestion and retrieval-augmented question answering", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file; replaces lexrag.yaml, lexrag.local.yaml and LEXRAG_* overrides
    #[arg(short, long, global = true, env = "LEXRAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service and ingestion worker (default)
    Serve,

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Vector index commands
    #[command(subcommand)]
    Index(IndexCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration with API keys redacted
    Show,
}

#[derive(Subcommand)]
pub enum IndexCommands {
    /// Summarize the persisted index snapshot
    Stats,
}
