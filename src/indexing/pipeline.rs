//! Indexing Pipeline
//!
//! `condense` (tokenize a document) -> `store` (write metadata and postings).
//! Shutdown enters the head stage and drains downstream; cancellation stops both
//! stages without finishing queued work.

use super::stages::{CondenseStage, StoreStage};
use super::types::{CondensedJob, Document, IndexingJob};
use crate::index::segment::Segment;
use crate::peers::types::now_ms;
use crate::workflow::accounting::MemoryProbe;
use crate::workflow::stage::{StageStats, WorkflowStage};
use crate::workflow::types::{JobId, StageConfig, WorkflowError};

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
        }
    }
}

pub struct IndexingPipeline {
    condense: WorkflowStage<IndexingJob>,
    store: WorkflowStage<CondensedJob>,
    cancel: CancellationToken,
}

impl IndexingPipeline {
    /// Spawns both stages on the current runtime, tail first.
    pub fn spawn(segment: Arc<Segment>, config: PipelineConfig, probe: Arc<dyn MemoryProbe>) -> Self {
        let cancel = CancellationToken::new();

        let store = WorkflowStage::spawn(
            StageConfig::new("store", config.workers, config.queue_capacity),
            StoreStage::new(segment),
            None,
            probe.clone(),
            cancel.child_token(),
        );

        let condense = WorkflowStage::spawn(
            StageConfig::new("condense", config.workers, config.queue_capacity),
            CondenseStage,
            Some(store.input()),
            probe,
            cancel.child_token(),
        );

        Self {
            condense,
            store,
            cancel,
        }
    }

    /// Enqueues a document, waiting while the head queue is full.
    pub async fn submit(&self, document: Document) -> Result<JobId, WorkflowError> {
        let job = IndexingJob::new(document, now_ms());
        let id = job.id.clone();
        self.condense.enqueue(job).await?;
        Ok(id)
    }

    /// Lets queued documents finish, then stops every worker.
    pub async fn shutdown(&self) {
        tracing::info!("Draining indexing pipeline");
        self.condense.shutdown().await;
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn join(&self) {
        self.condense.join().await;
        self.store.join().await;
        tracing::info!("Indexing pipeline stopped");
    }

    pub fn stats(&self) -> Vec<StageStats> {
        vec![self.condense.stats(), self.store.stats()]
    }
}
