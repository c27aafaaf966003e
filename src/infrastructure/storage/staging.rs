//! Staging area for uploaded documents.
//!
//! Each document is stored under its original file name. Bytes are written to
//! a `.partial` file, synced, and renamed into place, so a staged path only
//! ever exists once its content is durable.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::errors::DomainResult;

/// Suffix of files still being written.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Directory holding staged uploads, keyed by document name.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the staging directory if it does not exist.
    pub async fn ensure_dirs(&self) -> DomainResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Path a document is staged at.
    pub fn path_for(&self, document_name: &str) -> PathBuf {
        self.root.join(document_name)
    }

    /// Whether a document with this name is already staged.
    pub async fn exists(&self, document_name: &str) -> DomainResult<bool> {
        Ok(fs::try_exists(self.path_for(document_name)).await?)
    }

    /// Durably write a document and return its staged path.
    pub async fn write(&self, document_name: &str, bytes: &[u8]) -> DomainResult<PathBuf> {
        let target = self.path_for(document_name);
        let partial = self
            .root
            .join(format!("{document_name}{PARTIAL_SUFFIX}"));

        if let Err(err) = write_synced(&partial, bytes).await {
            let _ = fs::remove_file(&partial).await;
            return Err(err.into());
        }
        fs::rename(&partial, &target).await?;
        sync_dir(&self.root).await;

        tracing::debug!(
            document = %document_name,
            path = %target.display(),
            bytes = bytes.len(),
            "staged document"
        );
        Ok(target)
    }

    /// Read a staged document.
    pub async fn read(&self, path: &Path) -> DomainResult<Vec<u8>> {
        Ok(fs::read(path).await?)
    }

    /// Names of all fully staged documents, sorted.
    pub async fn list_documents(&self) -> DomainResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.ends_with(PARTIAL_SUFFIX) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) {
    let result = async { fs::File::open(dir).await?.sync_all().await }.await;
    if let Err(err) = result {
        tracing::warn!(dir = %dir.display(), error = %err, "failed to sync staging directory");
    }
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) {}
