//! In-memory vector index with single-file snapshots
//!
//! Chunks are kept in insertion order and searched with an exhaustive
//! cosine-similarity scan. The whole index is persisted as one JSON snapshot
//! that replaces the previous one atomically (temp file + rename), so a crash
//! mid-write never leaves a partial snapshot at the index path.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Chunk, ChunkMetadata, SearchHit};

/// Snapshot format version written by [`VectorIndex::persist`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// Index handle shared between the ingestion worker (writer) and queries (readers).
pub type SharedIndex = Arc<RwLock<VectorIndex>>;

/// Wrap an index for shared use.
pub fn shared(index: VectorIndex) -> SharedIndex {
    Arc::new(RwLock::new(index))
}

#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: Chunk,
    norm: f32,
}

/// Summary of an index for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub chunks: usize,
    pub dimension: Option<usize>,
    pub documents: BTreeSet<String>,
}

/// Ordered mapping from chunk id to embedded chunk.
///
/// Invariant: every stored chunk carries a vector of the index dimension.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dimension: Option<usize>,
    entries: Vec<IndexEntry>,
    positions: HashMap<String, usize>,
}

impl VectorIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector dimension, fixed by the first chunk added or loaded.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn get(&self, id: &str) -> Option<&Chunk> {
        self.positions.get(id).map(|&pos| &self.entries[pos].chunk)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Chunks in insertion order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|entry| &entry.chunk)
    }

    /// Names of all documents with at least one chunk in the index.
    pub fn document_names(&self) -> BTreeSet<String> {
        self.chunks()
            .filter_map(Chunk::document_name)
            .map(str::to_string)
            .collect()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            chunks: self.len(),
            dimension: self.dimension,
            documents: self.document_names(),
        }
    }

    /// Insert or overwrite chunks by id.
    ///
    /// The batch is validated as a whole before anything is inserted: every
    /// chunk must carry a non-empty, finite vector of the index dimension.
    /// An overwritten chunk keeps its original position.
    ///
    /// Callers must hold the index's exclusive write permit.
    pub fn add(&mut self, chunks: Vec<Chunk>) -> DomainResult<()> {
        let mut dimension = self.dimension;
        for chunk in &chunks {
            let vector = chunk.vector.as_deref().ok_or_else(|| {
                DomainError::ValidationFailed(format!("chunk {} has no vector", chunk.id))
            })?;
            if vector.is_empty() {
                return Err(DomainError::ValidationFailed(format!(
                    "chunk {} has an empty vector",
                    chunk.id
                )));
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(DomainError::ValidationFailed(format!(
                    "chunk {} has a non-finite vector component",
                    chunk.id
                )));
            }
            match dimension {
                Some(expected) if expected != vector.len() => {
                    return Err(DomainError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
                Some(_) => {}
                None => dimension = Some(vector.len()),
            }
        }

        self.dimension = dimension;
        for chunk in chunks {
            self.insert_unchecked(chunk);
        }
        Ok(())
    }

    fn insert_unchecked(&mut self, chunk: Chunk) {
        let norm = chunk.vector.as_deref().map_or(0.0, l2_norm);
        let entry = IndexEntry { chunk, norm };
        if let Some(&pos) = self.positions.get(&entry.chunk.id) {
            self.entries[pos] = entry;
        } else {
            self.positions
                .insert(entry.chunk.id.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }

    /// Exhaustive cosine-similarity scan.
    ///
    /// Results are ordered by descending score; equal scores keep insertion
    /// order. Returns at most `k` hits.
    pub fn search(&self, query: &[f32], k: usize) -> DomainResult<Vec<SearchHit>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(expected) = self.dimension {
            if query.len() != expected {
                return Err(DomainError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        let query_norm = l2_norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| {
                let vector = entry.chunk.vector.as_deref().unwrap_or_default();
                (pos, cosine(query, query_norm, vector, entry.norm))
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(pos, score)| SearchHit {
                chunk: self.entries[pos].chunk.clone(),
                score,
            })
            .collect())
    }

    /// Load a persisted snapshot.
    ///
    /// A missing file yields an empty index. A file that exists but cannot be
    /// decoded, or that violates the index invariants, fails with
    /// `DomainError::CorruptIndex`.
    pub fn load(path: &Path) -> DomainResult<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no index snapshot, starting empty");
                return Ok(Self::new());
            }
            Err(err) => return Err(err.into()),
        };

        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|e| corrupt(path, e.to_string()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(corrupt(
                path,
                format!("unsupported snapshot version {}", snapshot.version),
            ));
        }

        let mut index = Self {
            dimension: snapshot.dimension,
            ..Self::default()
        };
        for stored in snapshot.chunks {
            if stored.embedding.is_empty() {
                return Err(corrupt(path, format!("chunk {} has no embedding", stored.id)));
            }
            match index.dimension {
                Some(expected) if expected != stored.embedding.len() => {
                    return Err(corrupt(
                        path,
                        format!(
                            "chunk {} has dimension {}, expected {}",
                            stored.id,
                            stored.embedding.len(),
                            expected
                        ),
                    ));
                }
                Some(_) => {}
                None => index.dimension = Some(stored.embedding.len()),
            }
            if index.contains(&stored.id) {
                return Err(corrupt(path, format!("duplicate chunk id {}", stored.id)));
            }
            index.insert_unchecked(Chunk {
                id: stored.id,
                text: stored.text,
                metadata: stored.metadata,
                vector: Some(stored.embedding),
            });
        }

        tracing::debug!(
            path = %path.display(),
            chunks = index.len(),
            "loaded index snapshot"
        );
        Ok(index)
    }

    /// Atomically replace the snapshot at `path` with this index.
    pub fn persist(&self, path: &Path) -> DomainResult<()> {
        self.stage_snapshot(path)?.commit()
    }

    /// Write the snapshot to a temporary file next to `path` without making
    /// it visible.
    ///
    /// The returned [`PendingSnapshot`] must be committed to replace the
    /// snapshot at `path`; dropping it uncommitted removes the temporary file.
    pub fn stage_snapshot(&self, path: &Path) -> DomainResult<PendingSnapshot> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                DomainError::ValidationFailed(format!(
                    "index path {} has no file name",
                    path.display()
                ))
            })?;
        let temp_path =
            parent_dir(path).join(format!("{}{}", temp_prefix(file_name), Uuid::new_v4()));

        let pending = PendingSnapshot {
            temp_path,
            target: path.to_path_buf(),
            committed: false,
        };

        let file = File::create(&pending.temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &self.snapshot_ref())?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        Ok(pending)
    }

    fn snapshot_ref(&self) -> SnapshotRef<'_> {
        SnapshotRef {
            version: SNAPSHOT_VERSION,
            dimension: self.dimension,
            chunks: self
                .entries
                .iter()
                .map(|entry| StoredChunkRef {
                    id: &entry.chunk.id,
                    text: &entry.chunk.text,
                    metadata: &entry.chunk.metadata,
                    embedding: entry.chunk.vector.as_deref().unwrap_or_default(),
                })
                .collect(),
        }
    }

    /// Move a malformed snapshot aside so the service can start empty.
    ///
    /// Returns the path the snapshot was moved to.
    pub fn quarantine(path: &Path) -> DomainResult<PathBuf> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("index");
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
        let destination = parent_dir(path).join(format!("{file_name}.corrupt-{stamp}"));
        fs::rename(path, &destination)?;
        Ok(destination)
    }

    /// Remove temporary snapshots left next to `path` by persists that never
    /// reached the rename. Must not run while a persist is in progress.
    ///
    /// Returns the number of files removed.
    pub fn sweep_stale_snapshots(path: &Path) -> DomainResult<usize> {
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            return Ok(0);
        };
        let prefix = temp_prefix(file_name);

        let entries = match fs::read_dir(parent_dir(path)) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let is_stale = entry.file_name().to_string_lossy().starts_with(&prefix);
            if is_stale && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Load the snapshot at `path`, optionally quarantining it when corrupt.
    ///
    /// Runs at startup, so stale temporary snapshots are swept first.
    pub fn load_or_quarantine(path: &Path, quarantine_corrupt: bool) -> DomainResult<Self> {
        match Self::sweep_stale_snapshots(path) {
            Ok(0) => {}
            Ok(removed) => {
                tracing::warn!(
                    path = %path.display(),
                    removed,
                    "removed temporary snapshots left by an interrupted persist"
                );
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to sweep temporary snapshots"
                );
            }
        }

        match Self::load(path) {
            Err(DomainError::CorruptIndex { reason, .. }) if quarantine_corrupt => {
                let moved_to = Self::quarantine(path)?;
                tracing::warn!(
                    path = %path.display(),
                    moved_to = %moved_to.display(),
                    reason = %reason,
                    "index snapshot is corrupt; quarantined it and starting with an empty index"
                );
                Ok(Self::new())
            }
            other => other,
        }
    }
}

/// A fully written snapshot that has not replaced the live one yet.
#[derive(Debug)]
pub struct PendingSnapshot {
    temp_path: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl PendingSnapshot {
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Rename the temporary file over the target.
    pub fn commit(mut self) -> DomainResult<()> {
        fs::rename(&self.temp_path, &self.target)?;
        self.committed = true;
        if let Err(err) = sync_dir(parent_dir(&self.target)) {
            tracing::warn!(
                path = %self.target.display(),
                error = %err,
                "failed to sync index directory after rename"
            );
        }
        Ok(())
    }
}

impl Drop for PendingSnapshot {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    chunks: Vec<StoredChunk>,
}

#[derive(Deserialize)]
struct StoredChunk {
    id: String,
    text: String,
    #[serde(default)]
    metadata: ChunkMetadata,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    dimension: Option<usize>,
    chunks: Vec<StoredChunkRef<'a>>,
}

#[derive(Serialize)]
struct StoredChunkRef<'a> {
    id: &'a str,
    text: &'a str,
    metadata: &'a ChunkMetadata,
    embedding: &'a [f32],
}

fn corrupt(path: &Path, reason: String) -> DomainError {
    DomainError::CorruptIndex {
        path: path.display().to_string(),
        reason,
    }
}

/// File name prefix of temporary snapshots for the index file `file_name`.
fn temp_prefix(file_name: &str) -> String {
    format!(".{file_name}.tmp-")
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (a_norm * b_norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, vector: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: format!("text of {id}"),
            metadata: ChunkMetadata::new(),
            vector: Some(vector),
        }
    }

    fn ids(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|hit| hit.chunk.id.as_str()).collect()
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::load(&dir.path().join("absent.json")).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dimension(), None);
    }

    #[test]
    fn test_load_malformed_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(&path, b"{ not json").unwrap();

        let err = VectorIndex::load(&path).unwrap_err();
        assert!(matches!(err, DomainError::CorruptIndex { .. }));
    }

    #[test]
    fn test_load_rejects_inconsistent_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(
            &path,
            r#"{"version":1,"dimension":2,"chunks":[{"id":"a","text":"a","embedding":[1.0,0.0,0.0]}]}"#,
        )
        .unwrap();

        let err = VectorIndex::load(&path).unwrap_err();
        assert!(matches!(err, DomainError::CorruptIndex { .. }));
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(&path, r#"{"version":99,"chunks":[]}"#).unwrap();

        assert!(matches!(
            VectorIndex::load(&path),
            Err(DomainError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn test_add_rejects_chunk_without_vector() {
        let mut index = VectorIndex::new();
        let mut bare = chunk("a", vec![1.0]);
        bare.vector = None;

        let err = index.add(vec![chunk("ok", vec![1.0]), bare]).unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
        // Nothing from the rejected batch was inserted.
        assert!(index.is_empty());
    }

    #[test]
    fn test_add_rejects_dimension_mismatch() {
        let mut index = VectorIndex::new();
        index.add(vec![chunk("a", vec![1.0, 0.0])]).unwrap();

        let err = index.add(vec![chunk("b", vec![1.0, 0.0, 0.0])]).unwrap_err();
        assert!(matches!(
            err,
            DomainError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_add_overwrites_by_id_in_place() {
        let mut index = VectorIndex::new();
        index
            .add(vec![chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])])
            .unwrap();

        let mut newer = chunk("a", vec![0.5, 0.5]);
        newer.text = "updated".to_string();
        index.add(vec![newer]).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("a").unwrap().text, "updated");
        let order: Vec<_> = index.chunks().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_search_orders_by_descending_similarity() {
        let mut index = VectorIndex::new();
        index
            .add(vec![
                chunk("far", vec![0.0, 1.0]),
                chunk("near", vec![1.0, 0.1]),
                chunk("exact", vec![1.0, 0.0]),
            ])
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(ids(&hits), vec!["exact", "near", "far"]);
        assert!(hits[0].score > hits[1].score && hits[1].score > hits[2].score);
    }

    #[test]
    fn test_search_ties_keep_insertion_order() {
        let mut index = VectorIndex::new();
        index
            .add(vec![
                chunk("first", vec![2.0, 0.0]),
                chunk("other", vec![0.0, 1.0]),
                chunk("second", vec![1.0, 0.0]),
                chunk("third", vec![3.0, 0.0]),
            ])
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 4).unwrap();
        assert_eq!(ids(&hits), vec!["first", "second", "third", "other"]);
    }

    #[test]
    fn test_search_limits_and_edge_cases() {
        let mut index = VectorIndex::new();
        assert!(index.search(&[1.0], 3).unwrap().is_empty());

        index
            .add(vec![chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])])
            .unwrap();
        assert_eq!(index.search(&[1.0, 0.0], 1).unwrap().len(), 1);
        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
        assert!(matches!(
            index.search(&[1.0], 1),
            Err(DomainError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_persist_then_load_preserves_order_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut index = VectorIndex::new();
        let mut first = chunk("b", vec![0.0, 1.0]);
        first
            .metadata
            .insert("file_name".to_string(), "doc.pdf".to_string());
        index.add(vec![first, chunk("a", vec![1.0, 0.0])]).unwrap();
        index.persist(&path).unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.dimension(), Some(2));
        let order: Vec<_> = loaded.chunks().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(loaded.get("b").unwrap().document_name(), Some("doc.pdf"));
        assert_eq!(loaded.document_names().len(), 1);
    }

    #[test]
    fn test_merge_union_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut existing = VectorIndex::new();
        existing
            .add(vec![chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])])
            .unwrap();
        existing.persist(&path).unwrap();

        let mut merged = VectorIndex::load(&path).unwrap();
        merged
            .add(vec![
                chunk("c", vec![1.0, 1.0]),
                chunk("d", vec![1.0, -1.0]),
                chunk("b", vec![0.5, 0.5]),
            ])
            .unwrap();
        merged.persist(&path).unwrap();

        let reloaded = VectorIndex::load(&path).unwrap();
        let order: Vec<_> = reloaded.chunks().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
        assert_eq!(
            reloaded.get("b").unwrap().vector.as_deref(),
            Some(&[0.5, 0.5][..])
        );
    }

    #[test]
    fn test_interrupted_persist_leaves_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut index = VectorIndex::new();
        index.add(vec![chunk("a", vec![1.0, 0.0])]).unwrap();
        index.persist(&path).unwrap();

        index.add(vec![chunk("b", vec![0.0, 1.0])]).unwrap();
        let pending = index.stage_snapshot(&path).unwrap();
        let temp_path = pending.temp_path().to_path_buf();
        assert!(temp_path.exists());
        // Simulate a crash between writing the temp file and the rename.
        std::mem::forget(pending);

        let visible = VectorIndex::load(&path).unwrap();
        assert_eq!(visible.len(), 1);
        assert!(visible.contains("a"));
        assert!(!visible.contains("b"));

        // The next successful persist is unaffected by the stray temp file.
        index.persist(&path).unwrap();
        assert_eq!(VectorIndex::load(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_dropped_pending_snapshot_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut index = VectorIndex::new();
        index.add(vec![chunk("a", vec![1.0])]).unwrap();
        let pending = index.stage_snapshot(&path).unwrap();
        let temp_path = pending.temp_path().to_path_buf();
        drop(pending);

        assert!(!temp_path.exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_startup_sweeps_interrupted_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut index = VectorIndex::new();
        index.add(vec![chunk("a", vec![1.0, 0.0])]).unwrap();
        index.persist(&path).unwrap();
        for _ in 0..3 {
            std::mem::forget(index.stage_snapshot(&path).unwrap());
        }
        // Unrelated files and other indexes' temp files stay
        fs::write(dir.path().join("notes.txt"), b"keep").unwrap();
        fs::write(dir.path().join(".other.json.tmp-1"), b"keep").unwrap();

        let loaded = VectorIndex::load_or_quarantine(&path, false).unwrap();

        assert_eq!(loaded.len(), 1);
        let mut names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![".other.json.tmp-1", "index.json", "notes.txt"]);
    }

    #[test]
    fn test_sweep_without_index_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("index.json");
        assert_eq!(VectorIndex::sweep_stale_snapshots(&path).unwrap(), 0);
    }

    #[test]
    fn test_load_or_quarantine_moves_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(&path, b"garbage").unwrap();

        assert!(VectorIndex::load_or_quarantine(&path, false).is_err());
        assert!(path.exists());

        let index = VectorIndex::load_or_quarantine(&path, true).unwrap();
        assert!(index.is_empty());
        assert!(!path.exists());
        let quarantined = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .any(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("index.json.corrupt-")
            });
        assert!(quarantined);
    }
}
