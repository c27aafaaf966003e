//! Upload gate: validates uploads, stages them durably, enqueues ingestion.
//!
//! Re-uploading a document that is already staged, or currently being
//! staged by a concurrent request, is accepted as a no-op. An in-flight
//! reservation set closes the race between the existence check and the
//! staging write.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::IngestionJob;
use crate::infrastructure::storage::{StagingArea, PARTIAL_SUFFIX};
use crate::infrastructure::vector::VectorIndex;
use crate::services::ingestion_queue::IngestionQueue;

/// The only content type accepted for upload.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Result of an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Bytes staged and an ingestion job enqueued.
    Staged { document: String, job_id: Uuid },
    /// A document with this name was already staged; nothing was done.
    AlreadyExists { document: String },
}

impl UploadOutcome {
    /// Human-readable status returned to the uploader.
    pub fn message(&self) -> String {
        match self {
            Self::Staged { document, .. } => format!("Document {document} uploaded successfully"),
            Self::AlreadyExists { document } => format!("Document {document} already exists"),
        }
    }

    pub fn job_id(&self) -> Option<Uuid> {
        match self {
            Self::Staged { job_id, .. } => Some(*job_id),
            Self::AlreadyExists { .. } => None,
        }
    }
}

/// Accepts documents for ingestion.
pub struct UploadGate {
    staging: StagingArea,
    queue: Arc<IngestionQueue>,
    in_flight: Mutex<HashSet<String>>,
}

/// Releases a name reservation when staging finishes, however it finishes.
struct Reservation<'a> {
    gate: &'a UploadGate,
    name: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.gate
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
    }
}

impl UploadGate {
    pub fn new(staging: StagingArea, queue: Arc<IngestionQueue>) -> Self {
        Self {
            staging,
            queue,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Validate, stage and enqueue one document.
    ///
    /// Returns once the bytes are durably staged; ingestion runs later.
    pub async fn submit(
        &self,
        document_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> DomainResult<UploadOutcome> {
        validate_name(document_name)?;
        validate_content_type(content_type)?;
        let document = document_name.to_string();

        let Some(_reservation) = self.reserve(&document).await? else {
            tracing::info!(document = %document, "document already exists, skipping ingestion");
            return Ok(UploadOutcome::AlreadyExists { document });
        };

        let staged_path = self.staging.write(&document, bytes).await?;
        let job_id = self
            .queue
            .enqueue(IngestionJob::new(document.clone(), staged_path))
            .await?;

        tracing::info!(
            document = %document,
            job_id = %job_id,
            bytes = bytes.len(),
            "document staged for ingestion"
        );
        Ok(UploadOutcome::Staged { document, job_id })
    }

    /// Reserve a name for staging, or `None` if it is taken.
    async fn reserve(&self, name: &str) -> DomainResult<Option<Reservation<'_>>> {
        if !self.claim(name) {
            return Ok(None);
        }
        let reservation = Reservation {
            gate: self,
            name: name.to_string(),
        };
        if self.staging.exists(name).await? {
            return Ok(None);
        }
        Ok(Some(reservation))
    }

    fn claim(&self, name: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string())
    }

    /// Enqueue every staged document that has no chunk in `index` and no
    /// job in progress. Returns the new job ids.
    pub async fn requeue_unindexed(&self, index: &VectorIndex) -> DomainResult<Vec<Uuid>> {
        let indexed = index.document_names();
        let mut job_ids = Vec::new();

        for document in self.staging.list_documents().await? {
            if indexed.contains(&document) || self.queue.active_job(&document).await.is_some() {
                continue;
            }
            let staged_path = self.staging.path_for(&document);
            let job_id = self
                .queue
                .enqueue(IngestionJob::new(document.clone(), staged_path))
                .await?;
            tracing::info!(document = %document, job_id = %job_id, "resuming ingestion of staged document");
            job_ids.push(job_id);
        }

        Ok(job_ids)
    }
}

fn invalid_file() -> DomainError {
    DomainError::ValidationFailed("Invalid file".to_string())
}

/// A name must be a plain file name with a non-empty stem and extension.
fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty()
        || name != name.trim()
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control)
        || name.ends_with(PARTIAL_SUFFIX)
    {
        return Err(invalid_file());
    }
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => Ok(()),
        _ => Err(invalid_file()),
    }
}

fn validate_content_type(content_type: Option<&str>) -> DomainResult<()> {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim);
    match essence {
        Some(ct) if ct.eq_ignore_ascii_case(PDF_CONTENT_TYPE) => Ok(()),
        _ => Err(DomainError::ValidationFailed(
            "Invalid file format. Only PDF files are supported".to_string(),
        )),
    }
}
