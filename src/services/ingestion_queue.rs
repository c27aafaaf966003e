//! Single-consumer ingestion queue with an observable job registry.
//!
//! Jobs are delivered over an unbounded channel in enqueue order to exactly
//! one [`JobReceiver`], which the ingestion worker owns. The queue does not
//! deduplicate; the upload gate does that before enqueueing.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{IngestionJob, IngestionStage, JobRecord, JobStatus};

#[derive(Debug, Default)]
struct JobRegistry {
    records: HashMap<Uuid, JobRecord>,
    /// Job ids in enqueue order
    order: Vec<Uuid>,
}

impl JobRegistry {
    fn record_mut(&mut self, id: Uuid) -> DomainResult<&mut JobRecord> {
        self.records.get_mut(&id).ok_or(DomainError::JobNotFound(id))
    }
}

/// Receiving end of the queue. There is exactly one per queue.
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<IngestionJob>,
}

impl JobReceiver {
    /// Wait for the next job; `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<IngestionJob> {
        self.rx.recv().await
    }
}

/// FIFO queue of ingestion jobs.
pub struct IngestionQueue {
    tx: mpsc::UnboundedSender<IngestionJob>,
    registry: RwLock<JobRegistry>,
}

impl IngestionQueue {
    /// Create a queue and its single receiver.
    pub fn new() -> (Arc<Self>, JobReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Arc::new(Self {
            tx,
            registry: RwLock::new(JobRegistry::default()),
        });
        (queue, JobReceiver { rx })
    }

    /// Append a job. Never waits on the worker.
    pub async fn enqueue(&self, job: IngestionJob) -> DomainResult<Uuid> {
        self.enqueue_record(JobRecord::new(job)).await
    }

    async fn enqueue_record(&self, record: JobRecord) -> DomainResult<Uuid> {
        let id = record.id();
        let job = record.job.clone();

        // Registered before sending so the worker always finds the record
        let mut registry = self.registry.write().await;
        registry.records.insert(id, record);
        registry.order.push(id);

        if self.tx.send(job).is_err() {
            registry.records.remove(&id);
            registry.order.retain(|queued| *queued != id);
            return Err(DomainError::ExecutionFailed(
                "ingestion queue is closed".to_string(),
            ));
        }
        drop(registry);

        tracing::debug!(job_id = %id, "ingestion job enqueued");
        Ok(id)
    }

    /// Re-enqueue the document of a failed job as a new job.
    pub async fn retry(&self, id: Uuid) -> DomainResult<Uuid> {
        let record = {
            let registry = self.registry.read().await;
            let failed = registry.records.get(&id).ok_or(DomainError::JobNotFound(id))?;

            if failed.status() != JobStatus::Failed {
                return Err(DomainError::InvalidStateTransition {
                    from: failed.status().as_str().to_string(),
                    to: JobStatus::Pending.as_str().to_string(),
                    reason: "only failed jobs can be retried".to_string(),
                });
            }

            let name = &failed.job.document_name;
            if Self::active_for(&registry, name).is_some() {
                return Err(DomainError::ValidationFailed(format!(
                    "Document {name} is already being ingested"
                )));
            }

            let mut record = JobRecord::new(IngestionJob::new(
                name.clone(),
                failed.job.staged_path.clone(),
            ));
            record.retry_of = Some(id);
            record
        };

        let new_id = self.enqueue_record(record).await?;
        tracing::info!(job_id = %new_id, retry_of = %id, "ingestion job retried");
        Ok(new_id)
    }

    /// Look up a job.
    pub async fn get(&self, id: Uuid) -> DomainResult<JobRecord> {
        self.registry
            .read()
            .await
            .records
            .get(&id)
            .cloned()
            .ok_or(DomainError::JobNotFound(id))
    }

    /// All jobs in enqueue order.
    pub async fn list(&self) -> Vec<JobRecord> {
        let registry = self.registry.read().await;
        registry
            .order
            .iter()
            .filter_map(|id| registry.records.get(id).cloned())
            .collect()
    }

    /// Id of the pending or running job for a document, if any.
    pub async fn active_job(&self, document_name: &str) -> Option<Uuid> {
        Self::active_for(&*self.registry.read().await, document_name)
    }

    fn active_for(registry: &JobRegistry, document_name: &str) -> Option<Uuid> {
        registry
            .records
            .values()
            .find(|r| r.job.document_name == document_name && !r.status().is_terminal())
            .map(JobRecord::id)
    }

    /// Number of jobs not yet picked up.
    pub async fn pending_count(&self) -> usize {
        self.registry
            .read()
            .await
            .records
            .values()
            .filter(|r| r.status() == JobStatus::Pending)
            .count()
    }

    pub(crate) async fn mark_running(&self, id: Uuid) -> DomainResult<()> {
        self.update(id, |record| {
            Self::transition(record, JobStatus::Running)?;
            record.started_at = Some(Utc::now());
            Ok(())
        })
        .await
    }

    pub(crate) async fn set_stage(&self, id: Uuid, stage: IngestionStage) -> DomainResult<()> {
        self.update(id, |record| {
            record.stage = Some(stage);
            Ok(())
        })
        .await
    }

    pub(crate) async fn mark_succeeded(&self, id: Uuid, chunks_indexed: usize) -> DomainResult<()> {
        self.update(id, |record| {
            Self::transition(record, JobStatus::Succeeded)?;
            record.stage = Some(IngestionStage::Done);
            record.chunks_indexed = chunks_indexed;
            record.finished_at = Some(Utc::now());
            Ok(())
        })
        .await
    }

    pub(crate) async fn mark_failed(&self, id: Uuid, error: String) -> DomainResult<()> {
        self.update(id, |record| {
            Self::transition(record, JobStatus::Failed)?;
            record.stage = Some(IngestionStage::Failed);
            record.error = Some(error);
            record.finished_at = Some(Utc::now());
            Ok(())
        })
        .await
    }

    async fn update(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut JobRecord) -> DomainResult<()>,
    ) -> DomainResult<()> {
        let mut registry = self.registry.write().await;
        apply(registry.record_mut(id)?)
    }

    fn transition(record: &mut JobRecord, to: JobStatus) -> DomainResult<()> {
        let from = record.status();
        if !from.can_transition_to(to) {
            return Err(DomainError::InvalidStateTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!("job {} cannot move to {}", record.id(), to.as_str()),
            });
        }
        record.job.status = to;
        Ok(())
    }
}
