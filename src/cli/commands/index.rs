//! `lexrag index stats`

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::models::Config;
use crate::infrastructure::vector::VectorIndex;

#[derive(Debug, Serialize)]
struct IndexStatsOutput {
    path: String,
    chunks: usize,
    dimension: Option<usize>,
    documents: Vec<String>,
}

/// Print a summary of the persisted index snapshot.
pub fn handle_stats(config: &Config, json: bool) -> Result<()> {
    let path = &config.storage.index_path;
    let index = VectorIndex::load(path)
        .with_context(|| format!("Failed to load index {}", path.display()))?;
    let stats = index.stats();

    let output = IndexStatsOutput {
        path: path.display().to_string(),
        chunks: stats.chunks,
        dimension: stats.dimension,
        documents: stats.documents.into_iter().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Index:      {}", output.path);
    println!("Chunks:     {}", output.chunks);
    match output.dimension {
        Some(dimension) => println!("Dimension:  {dimension}"),
        None => println!("Dimension:  -"),
    }
    println!("Documents:  {}", output.documents.len());
    for document in &output.documents {
        println!("  - {document}");
    }
    Ok(())
}
