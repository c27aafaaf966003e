//! Ingestion job domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Lifecycle status of an ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the queue
    Pending,
    /// Picked up by the worker
    Running,
    /// Chunks merged and the index persisted
    Succeeded,
    /// Ingestion stopped with an error
    Failed,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> Vec<JobStatus> {
        match self {
            Self::Pending => vec![Self::Running],
            Self::Running => vec![Self::Succeeded, Self::Failed],
            Self::Succeeded | Self::Failed => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

/// Stage of the ingestion state machine.
///
/// Stages run strictly in order; `Failed` is absorbing and reachable from
/// every stage before `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStage {
    Extracting,
    Chunking,
    Embedding,
    Merging,
    Persisting,
    Done,
    Failed,
}

impl IngestionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracting => "extracting",
            Self::Chunking => "chunking",
            Self::Embedding => "embedding",
            Self::Merging => "merging",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// The stage that follows this one on the success path.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Extracting => Some(Self::Chunking),
            Self::Chunking => Some(Self::Embedding),
            Self::Embedding => Some(Self::Merging),
            Self::Merging => Some(Self::Persisting),
            Self::Persisting => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn can_transition_to(&self, to: Self) -> bool {
        if to == Self::Failed {
            return !self.is_terminal();
        }
        self.next() == Some(to)
    }

    /// Move to `to`, rejecting out-of-order transitions.
    pub fn transition(self, to: Self) -> DomainResult<Self> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(DomainError::InvalidStateTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: "ingestion stages run strictly in order".to_string(),
            })
        }
    }
}

impl std::fmt::Display for IngestionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work for the ingestion worker: one staged document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionJob {
    pub id: Uuid,
    pub document_name: String,
    pub staged_path: PathBuf,
    pub enqueued_at: DateTime<Utc>,
    pub status: JobStatus,
}

impl IngestionJob {
    pub fn new(document_name: impl Into<String>, staged_path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_name: document_name.into(),
            staged_path: staged_path.into(),
            enqueued_at: Utc::now(),
            status: JobStatus::Pending,
        }
    }
}

/// Observable record of a job's progress, kept by the ingestion queue.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    #[serde(flatten)]
    pub job: IngestionJob,
    pub stage: Option<IngestionStage>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub chunks_indexed: usize,
    pub error: Option<String>,
    /// Set when this job was created by retrying a failed one.
    pub retry_of: Option<Uuid>,
}

impl JobRecord {
    pub fn new(job: IngestionJob) -> Self {
        Self {
            job,
            stage: None,
            started_at: None,
            finished_at: None,
            chunks_indexed: 0,
            error: None,
            retry_of: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.job.id
    }

    pub fn status(&self) -> JobStatus {
        self.job.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_transitions() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Succeeded));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Succeeded.is_terminal());
    }

    #[test]
    fn test_stage_success_path() {
        let mut stage = IngestionStage::Extracting;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            stage = stage.transition(next).unwrap();
            visited.push(stage);
        }
        assert_eq!(
            visited,
            vec![
                IngestionStage::Extracting,
                IngestionStage::Chunking,
                IngestionStage::Embedding,
                IngestionStage::Merging,
                IngestionStage::Persisting,
                IngestionStage::Done,
            ]
        );
    }

    #[test]
    fn test_failed_reachable_from_working_stages_only() {
        for stage in [
            IngestionStage::Extracting,
            IngestionStage::Chunking,
            IngestionStage::Embedding,
            IngestionStage::Merging,
            IngestionStage::Persisting,
        ] {
            assert!(stage.can_transition_to(IngestionStage::Failed));
        }
        assert!(!IngestionStage::Done.can_transition_to(IngestionStage::Failed));
        assert!(!IngestionStage::Failed.can_transition_to(IngestionStage::Failed));
    }

    #[test]
    fn test_stage_skip_rejected() {
        let err = IngestionStage::Extracting
            .transition(IngestionStage::Merging)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = IngestionJob::new("a.pdf", "/tmp/a.pdf");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.document_name, "a.pdf");
    }

    #[test]
    fn test_job_record_serializes_flat() {
        let record = JobRecord::new(IngestionJob::new("a.pdf", "/tmp/a.pdf"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["document_name"], "a.pdf");
        assert_eq!(json["status"], "pending");
        assert!(json["stage"].is_null());
    }
}
