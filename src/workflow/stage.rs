//! Stage Worker Pool
//!
//! A [`WorkflowStage`] owns a bounded input queue and a fixed set of workers that
//! pull jobs from it, run the stage transform and push results into the next
//! stage's queue.
//!
//! ## Worker Lifecycle
//! `Open` (run `open()`) -> `Running` (pull / transform / forward) ->
//! `Closing` (run `close()`) -> `Closed`.
//!
//! ## Shutdown
//! - A `Job::Shutdown` (or a closed queue) stops the worker that pulls it. The last
//!   worker of a stage to stop sends one shutdown job per downstream worker, so the
//!   signal drains through the whole chain.
//! - Cancelling the stage token stops a waiting worker at once. It neither runs the
//!   transform nor the error handler, and forwards nothing.
//!
//! Transform errors and panics are logged and handed to the handler's `on_error`;
//! they never stop a worker.

use super::accounting::{CycleAccounting, MemoryProbe};
use super::types::*;

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The work a stage performs on each job.
#[async_trait]
pub trait StageHandler: Send + Sync + 'static {
    type Input: WorkflowJob;
    type Output: Send + 'static;

    /// Acquires per-worker resources before the first job.
    async fn open(&self) -> Result<()> {
        Ok(())
    }

    /// Transforms one job. `Some(output)` is enqueued into the next stage.
    async fn process(&self, job: &mut Self::Input) -> Result<Option<Self::Output>>;

    /// Recovery hook for a job whose transform failed.
    fn on_error(&self, job: &Self::Input, error: &anyhow::Error) {
        tracing::warn!("Job {} dropped after failure: {:#}", job.id().0, error);
    }

    /// Releases per-worker resources after the last job.
    async fn close(&self) {}
}

/// Producer-side handle to a stage queue.
pub struct StageInput<T> {
    stage: Arc<str>,
    tx: mpsc::Sender<Job<T>>,
    workers: usize,
}

impl<T> Clone for StageInput<T> {
    fn clone(&self) -> Self {
        Self {
            stage: self.stage.clone(),
            tx: self.tx.clone(),
            workers: self.workers,
        }
    }
}

impl<T: Send + 'static> StageInput<T> {
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Enqueues a job, waiting while the queue is full.
    pub async fn enqueue(&self, job: T) -> Result<(), WorkflowError> {
        self.tx
            .send(Job::Data(job))
            .await
            .map_err(|_| WorkflowError::Closed {
                stage: self.stage.to_string(),
            })
    }

    /// Sends one shutdown job per worker of the stage.
    pub async fn shutdown(&self) {
        for _ in 0..self.workers {
            if self.tx.send(Job::Shutdown).await.is_err() {
                break;
            }
        }
        tracing::debug!("Shutdown signalled to stage '{}'", self.stage);
    }

    /// Jobs currently waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

#[derive(Default)]
struct StageMetrics {
    processed: AtomicU64,
    failed: AtomicU64,
    alive: AtomicUsize,
    accounting: Mutex<CycleAccounting>,
    states: Mutex<Vec<WorkerState>>,
}

/// Point-in-time view of a stage for monitoring.
#[derive(Debug, Clone, Serialize)]
pub struct StageStats {
    pub name: String,
    pub workers: usize,
    pub alive_workers: usize,
    pub queue_len: usize,
    pub processed: u64,
    pub failed: u64,
    pub busy_cycles: u64,
    pub busy_time_ms: u128,
    pub memory_use: u64,
    pub average_memory: u64,
}

enum Pulled<T> {
    Job(T),
    Shutdown,
    Cancelled,
}

struct StageRuntime<H: StageHandler> {
    name: Arc<str>,
    handler: H,
    rx: tokio::sync::Mutex<mpsc::Receiver<Job<H::Input>>>,
    next: Option<StageInput<H::Output>>,
    metrics: Arc<StageMetrics>,
    probe: Arc<dyn MemoryProbe>,
    cancel: CancellationToken,
}

impl<H: StageHandler> StageRuntime<H> {
    async fn worker_loop(self: Arc<Self>, worker_id: usize) {
        self.set_state(worker_id, WorkerState::Open);

        let forward = match self.handler.open().await {
            Ok(()) => {
                self.set_state(worker_id, WorkerState::Running);
                tracing::debug!("Stage '{}' worker {} running", self.name, worker_id);
                self.run(worker_id).await
            }
            Err(e) => {
                tracing::error!(
                    "Stage '{}' worker {} failed to open: {:#}",
                    self.name,
                    worker_id,
                    e
                );
                true
            }
        };

        self.set_state(worker_id, WorkerState::Closing);
        self.handler.close().await;
        self.set_state(worker_id, WorkerState::Closed);

        let last = self.metrics.alive.fetch_sub(1, Ordering::AcqRel) == 1;
        tracing::debug!("Stage '{}' worker {} closed", self.name, worker_id);

        if last {
            tracing::info!("Stage '{}' terminated", self.name);
            if forward && let Some(next) = &self.next {
                next.shutdown().await;
            }
        }
    }

    /// Pulls and processes jobs until told to stop.
    /// Returns whether the shutdown signal should be forwarded downstream.
    async fn run(&self, worker_id: usize) -> bool {
        loop {
            let pulled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Pulled::Cancelled,
                job = self.pull() => match job {
                    Some(Job::Data(job)) => Pulled::Job(job),
                    Some(Job::Shutdown) | None => Pulled::Shutdown,
                },
            };

            match pulled {
                Pulled::Job(job) => self.run_cycle(worker_id, job).await,
                Pulled::Shutdown => {
                    tracing::debug!("Stage '{}' worker {} got shutdown", self.name, worker_id);
                    return true;
                }
                Pulled::Cancelled => {
                    tracing::debug!("Stage '{}' worker {} cancelled", self.name, worker_id);
                    return false;
                }
            }
        }
    }

    async fn pull(&self) -> Option<Job<H::Input>> {
        self.rx.lock().await.recv().await
    }

    async fn run_cycle(&self, worker_id: usize, mut job: H::Input) {
        job.set_status(JobStatus::Running);

        let mem_before = self.probe.used_bytes();
        let started = Instant::now();
        let result = match AssertUnwindSafe(self.handler.process(&mut job))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(anyhow::anyhow!(
                "transform panicked: {}",
                panic_message(panic.as_ref())
            )),
        };
        let busy = started.elapsed();
        let mem_after = self.probe.used_bytes();
        self.metrics
            .accounting
            .lock()
            .record(busy, mem_before, mem_after);

        match result {
            Ok(output) => {
                job.set_status(JobStatus::Done);
                self.metrics.processed.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(
                    "Stage '{}' worker {} finished job {} in {:?}",
                    self.name,
                    worker_id,
                    job.id().0,
                    busy
                );
                if let Some(output) = output {
                    self.forward(output).await;
                }
            }
            Err(e) => {
                job.set_status(JobStatus::Failed);
                self.metrics.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    "Stage '{}' worker {} failed on job {}: {:#}",
                    self.name,
                    worker_id,
                    job.id().0,
                    e
                );
                self.handler.on_error(&job, &e);
            }
        }
    }

    async fn forward(&self, output: H::Output) {
        let Some(next) = &self.next else {
            return;
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::debug!("Stage '{}' dropped output on cancellation", self.name);
            }
            sent = next.enqueue(output) => {
                if let Err(e) = sent {
                    tracing::warn!("Stage '{}' could not forward output: {}", self.name, e);
                }
            }
        }
    }

    fn set_state(&self, worker_id: usize, state: WorkerState) {
        if let Some(slot) = self.metrics.states.lock().get_mut(worker_id) {
            *slot = state;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// A running stage: its input queue plus the workers draining it.
pub struct WorkflowStage<I> {
    input: StageInput<I>,
    workers: usize,
    metrics: Arc<StageMetrics>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl<I: WorkflowJob> WorkflowStage<I> {
    /// Creates the queue and spawns `config.workers` workers on the current runtime.
    pub fn spawn<H>(
        config: StageConfig,
        handler: H,
        next: Option<StageInput<H::Output>>,
        probe: Arc<dyn MemoryProbe>,
        cancel: CancellationToken,
    ) -> Self
    where
        H: StageHandler<Input = I>,
    {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let name: Arc<str> = Arc::from(config.name.as_str());

        let metrics = Arc::new(StageMetrics {
            alive: AtomicUsize::new(config.workers),
            states: Mutex::new(vec![WorkerState::Open; config.workers]),
            ..Default::default()
        });

        let runtime = Arc::new(StageRuntime {
            name: name.clone(),
            handler,
            rx: tokio::sync::Mutex::new(rx),
            next,
            metrics: metrics.clone(),
            probe,
            cancel: cancel.clone(),
        });

        let handles = (0..config.workers)
            .map(|worker_id| {
                let runtime = runtime.clone();
                tokio::spawn(async move {
                    runtime.worker_loop(worker_id).await;
                })
            })
            .collect();

        tracing::info!(
            "Stage '{}' started with {} workers (queue capacity {})",
            name,
            config.workers,
            config.queue_capacity
        );

        Self {
            input: StageInput {
                stage: name,
                tx,
                workers: config.workers,
            },
            workers: config.workers,
            metrics,
            handles: Mutex::new(handles),
            cancel,
        }
    }

    pub fn input(&self) -> StageInput<I> {
        self.input.clone()
    }

    pub async fn enqueue(&self, job: I) -> Result<(), WorkflowError> {
        self.input.enqueue(job).await
    }

    /// Starts an orderly shutdown: queued jobs ahead of the signal still run.
    pub async fn shutdown(&self) {
        self.input.shutdown().await;
    }

    /// Interrupts waiting workers without processing anything further.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits until every worker of this stage has terminated.
    pub async fn join(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker of stage '{}' ended abnormally: {}", self.input.stage, e);
            }
        }
    }

    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.metrics.states.lock().clone()
    }

    pub fn stats(&self) -> StageStats {
        let accounting = self.metrics.accounting.lock().clone();
        StageStats {
            name: self.input.stage.to_string(),
            workers: self.workers,
            alive_workers: self.metrics.alive.load(Ordering::Acquire),
            queue_len: self.input.queue_len(),
            processed: self.metrics.processed.load(Ordering::Relaxed),
            failed: self.metrics.failed.load(Ordering::Relaxed),
            busy_cycles: accounting.busy_cycles,
            busy_time_ms: accounting.busy_time.as_millis(),
            memory_use: accounting.memory_use,
            average_memory: accounting.average_memory(),
        }
    }
}
