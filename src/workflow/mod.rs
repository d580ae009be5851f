//! Staged Workflow Engine
//!
//! Moves jobs (parsed documents, condensed postings) between processing stages.
//!
//! ## Architecture Overview
//! 1. **Queues**: every stage owns a bounded FIFO queue. A producer enqueueing into
//!    a full queue waits, so a slow stage throttles everything upstream of it.
//! 2. **Workers**: each stage runs several workers sharing the queue. A worker pulls
//!    one job, runs the stage transform and enqueues the result downstream.
//! 3. **Shutdown**: `Job::Shutdown` is forwarded stage to stage once the last worker
//!    of a stage has stopped; a `CancellationToken` interrupts everything at once.
//! 4. **Accounting**: busy time and memory deltas are recorded per cycle.
//!
//! ## Submodules
//! - **`types`**: jobs, statuses and stage configuration.
//! - **`stage`**: the `StageHandler` trait and the `WorkflowStage` worker pool.
//! - **`accounting`**: cycle statistics and memory probes.

pub mod accounting;
pub mod stage;
pub mod types;

#[cfg(test)]
mod tests;
