use serde::{Deserialize, Serialize};

/// Unique identifier for a job moving through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl JobId {
    /// Generates a new random UUID v4-based JobId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of a job inside one stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobStatus {
    /// Created by a producer, not yet picked up.
    New,
    /// A worker is running the stage transform on it.
    Running,
    /// The transform returned successfully.
    Done,
    /// The transform returned an error or panicked.
    Failed,
}

/// What travels through a stage queue.
///
/// Shutdown is its own variant rather than a magic job value, so a worker has
/// to handle it explicitly and it can never be mistaken for data.
#[derive(Debug)]
pub enum Job<T> {
    Data(T),
    Shutdown,
}

/// Behaviour every job must provide to the worker loop.
pub trait WorkflowJob: Send + 'static {
    fn id(&self) -> &JobId;
    fn status(&self) -> JobStatus;
    fn set_status(&mut self, status: JobStatus);
}

/// Per-worker state machine.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum WorkerState {
    Open,
    Running,
    Closing,
    Closed,
}

/// Sizing of one stage.
#[derive(Debug, Clone)]
pub struct StageConfig {
    pub name: String,
    /// Parallel workers pulling from the stage queue.
    pub workers: usize,
    /// Bound of the stage input queue. Producers wait when it is full.
    pub queue_capacity: usize,
}

impl StageConfig {
    pub fn new(name: &str, workers: usize, queue_capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            workers: workers.max(1),
            queue_capacity: queue_capacity.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("stage '{stage}' no longer accepts jobs")]
    Closed { stage: String },
}
