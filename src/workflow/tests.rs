//! Workflow Module Tests
//!
//! ## Test Scopes
//! - **Shutdown**: poison jobs stop workers and travel down the chain.
//! - **Ordering / Backpressure**: FIFO per queue and blocking enqueue on full queues.
//! - **Isolation**: a failing or panicking transform does not stop its worker.
//! - **Cancellation**: an interrupted worker stops without touching the job handlers.
//! - **Accounting**: the memory heuristic for cycles that observed reclamation.

#[cfg(test)]
mod tests {
    use crate::workflow::accounting::{CycleAccounting, MemoryProbe, NoMemoryProbe};
    use crate::workflow::stage::{StageHandler, WorkflowStage};
    use crate::workflow::types::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{Semaphore, mpsc};
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug)]
    struct TestJob {
        id: JobId,
        status: JobStatus,
        value: u32,
    }

    impl TestJob {
        fn new(value: u32) -> Self {
            Self {
                id: JobId::new(),
                status: JobStatus::New,
                value,
            }
        }
    }

    impl WorkflowJob for TestJob {
        fn id(&self) -> &JobId {
            &self.id
        }
        fn status(&self) -> JobStatus {
            self.status
        }
        fn set_status(&mut self, status: JobStatus) {
            self.status = status;
        }
    }

    /// Records every value; fails on `fail_on`, panics on `panic_on`.
    #[derive(Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<u32>>>,
        errors: Arc<Mutex<Vec<(u32, JobStatus)>>>,
        closes: Arc<AtomicUsize>,
        fail_on: Option<u32>,
        panic_on: Option<u32>,
    }

    #[async_trait]
    impl StageHandler for Recorder {
        type Input = TestJob;
        type Output = ();

        async fn process(&self, job: &mut TestJob) -> anyhow::Result<Option<()>> {
            assert_eq!(job.status(), JobStatus::Running);
            self.seen.lock().push(job.value);
            if Some(job.value) == self.fail_on {
                anyhow::bail!("refusing job {}", job.value);
            }
            if Some(job.value) == self.panic_on {
                panic!("transform blew up on {}", job.value);
            }
            Ok(None)
        }

        fn on_error(&self, job: &TestJob, _error: &anyhow::Error) {
            self.errors.lock().push((job.value, job.status()));
        }

        async fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Multiplies by ten and passes the result on.
    struct Multiplier;

    #[async_trait]
    impl StageHandler for Multiplier {
        type Input = TestJob;
        type Output = TestJob;

        async fn process(&self, job: &mut TestJob) -> anyhow::Result<Option<TestJob>> {
            Ok(Some(TestJob::new(job.value * 10)))
        }
    }

    /// Reports each job it starts, then waits for a permit.
    struct Gated {
        started: mpsc::UnboundedSender<u32>,
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl StageHandler for Gated {
        type Input = TestJob;
        type Output = ();

        async fn process(&self, job: &mut TestJob) -> anyhow::Result<Option<()>> {
            let _ = self.started.send(job.value);
            self.gate.acquire().await?.forget();
            Ok(None)
        }
    }

    struct FailingOpen;

    #[async_trait]
    impl StageHandler for FailingOpen {
        type Input = TestJob;
        type Output = ();

        async fn open(&self) -> anyhow::Result<()> {
            anyhow::bail!("no resources")
        }

        async fn process(&self, _job: &mut TestJob) -> anyhow::Result<Option<()>> {
            unreachable!("never opened")
        }
    }

    fn probe() -> Arc<dyn MemoryProbe> {
        Arc::new(NoMemoryProbe)
    }

    const WAIT: Duration = Duration::from_secs(5);

    // ============================================================
    // SHUTDOWN & ORDERING
    // ============================================================

    #[tokio::test]
    async fn test_n_jobs_then_poison_runs_exactly_n_in_order() {
        // ARRANGE
        let recorder = Recorder::default();
        let seen = recorder.seen.clone();
        let closes = recorder.closes.clone();
        let stage = WorkflowStage::spawn(
            StageConfig::new("record", 1, 8),
            recorder,
            None,
            probe(),
            CancellationToken::new(),
        );

        // ACT
        for value in 0..20 {
            stage.enqueue(TestJob::new(value)).await.unwrap();
        }
        stage.shutdown().await;
        timeout(WAIT, stage.join()).await.expect("worker must terminate");

        // ASSERT
        assert_eq!(*seen.lock(), (0..20).collect::<Vec<_>>());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(stage.worker_states(), vec![WorkerState::Closed]);
        let stats = stage.stats();
        assert_eq!(stats.processed, 20);
        assert_eq!(stats.busy_cycles, 20);
        assert_eq!(stats.alive_workers, 0);
    }

    #[tokio::test]
    async fn test_poison_propagates_through_chain() {
        // ARRANGE: multiplier (2 workers) -> recorder (3 workers)
        let recorder = Recorder::default();
        let seen = recorder.seen.clone();
        let closes = recorder.closes.clone();
        let cancel = CancellationToken::new();
        let tail = WorkflowStage::spawn(
            StageConfig::new("tail", 3, 4),
            recorder,
            None,
            probe(),
            cancel.clone(),
        );
        let head = WorkflowStage::spawn(
            StageConfig::new("head", 2, 4),
            Multiplier,
            Some(tail.input()),
            probe(),
            cancel,
        );

        // ACT
        for value in 1..=10 {
            head.enqueue(TestJob::new(value)).await.unwrap();
        }
        head.shutdown().await;
        timeout(WAIT, head.join()).await.expect("head must terminate");
        timeout(WAIT, tail.join()).await.expect("tail must terminate");

        // ASSERT: every job made it through exactly once
        let mut values = seen.lock().clone();
        values.sort();
        assert_eq!(values, (1..=10).map(|v| v * 10).collect::<Vec<_>>());
        assert_eq!(closes.load(Ordering::SeqCst), 3);
        assert!(tail.worker_states().iter().all(|s| *s == WorkerState::Closed));
    }

    #[tokio::test]
    async fn test_enqueue_after_termination_fails() {
        let stage = WorkflowStage::spawn(
            StageConfig::new("short", 1, 1),
            Recorder::default(),
            None,
            probe(),
            CancellationToken::new(),
        );

        stage.shutdown().await;
        timeout(WAIT, stage.join()).await.unwrap();

        let result = stage.enqueue(TestJob::new(1)).await;
        assert_eq!(
            result,
            Err(WorkflowError::Closed {
                stage: "short".to_string()
            })
        );
    }

    // ============================================================
    // BACKPRESSURE
    // ============================================================

    #[tokio::test]
    async fn test_full_queue_blocks_producer_until_consumer_takes_one() {
        // ARRANGE: one gated worker, queue capacity 3
        const CAPACITY: usize = 3;
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        let stage = WorkflowStage::spawn(
            StageConfig::new("gated", 1, CAPACITY),
            Gated {
                started: started_tx,
                gate: gate.clone(),
            },
            None,
            probe(),
            CancellationToken::new(),
        );
        let input = stage.input();

        // The worker holds job 0 inside the transform
        input.enqueue(TestJob::new(0)).await.unwrap();
        assert_eq!(started_rx.recv().await, Some(0));

        // ACT: fill the queue
        for value in 1..=CAPACITY as u32 {
            timeout(WAIT, input.enqueue(TestJob::new(value)))
                .await
                .expect("queue has room")
                .unwrap();
        }
        assert_eq!(input.queue_len(), CAPACITY);

        // ASSERT: the next producer waits
        let blocked = timeout(Duration::from_millis(100), input.enqueue(TestJob::new(99))).await;
        assert!(blocked.is_err(), "enqueue into a full queue must wait");

        // Releasing job 0 lets the worker pull job 1 and frees a slot
        gate.add_permits(1);
        timeout(WAIT, input.enqueue(TestJob::new(100)))
            .await
            .expect("slot must free up")
            .unwrap();
        assert_eq!(started_rx.recv().await, Some(1));

        gate.add_permits(64);
        stage.shutdown().await;
        timeout(WAIT, stage.join()).await.unwrap();
    }

    // ============================================================
    // FAILURE ISOLATION
    // ============================================================

    #[tokio::test]
    async fn test_failing_job_does_not_stop_worker() {
        // ARRANGE
        let recorder = Recorder {
            fail_on: Some(3),
            panic_on: Some(5),
            ..Default::default()
        };
        let seen = recorder.seen.clone();
        let errors = recorder.errors.clone();
        let stage = WorkflowStage::spawn(
            StageConfig::new("fragile", 1, 16),
            recorder,
            None,
            probe(),
            CancellationToken::new(),
        );

        // ACT
        for value in 0..8 {
            stage.enqueue(TestJob::new(value)).await.unwrap();
        }
        stage.shutdown().await;
        timeout(WAIT, stage.join()).await.unwrap();

        // ASSERT: jobs after 3 and 5 were still processed
        assert_eq!(*seen.lock(), (0..8).collect::<Vec<_>>());
        assert_eq!(
            *errors.lock(),
            vec![(3, JobStatus::Failed), (5, JobStatus::Failed)]
        );
        let stats = stage.stats();
        assert_eq!(stats.processed, 6);
        assert_eq!(stats.failed, 2);
    }

    #[tokio::test]
    async fn test_open_failure_closes_worker() {
        let stage = WorkflowStage::spawn(
            StageConfig::new("broken", 2, 4),
            FailingOpen,
            None,
            probe(),
            CancellationToken::new(),
        );

        timeout(WAIT, stage.join()).await.unwrap();

        assert_eq!(
            stage.worker_states(),
            vec![WorkerState::Closed, WorkerState::Closed]
        );
    }

    // ============================================================
    // CANCELLATION
    // ============================================================

    #[tokio::test]
    async fn test_cancel_stops_waiting_worker_without_forwarding() {
        // ARRANGE
        let cancel = CancellationToken::new();
        let recorder = Recorder::default();
        let seen = recorder.seen.clone();
        let errors = recorder.errors.clone();
        let tail = WorkflowStage::spawn(
            StageConfig::new("tail", 1, 4),
            Recorder::default(),
            None,
            probe(),
            CancellationToken::new(),
        );
        let head = WorkflowStage::spawn(
            StageConfig::new("head", 2, 4),
            recorder,
            None,
            probe(),
            cancel.clone(),
        );

        // ACT
        cancel.cancel();
        timeout(WAIT, head.join()).await.expect("cancel must stop workers");

        // ASSERT
        assert!(seen.lock().is_empty());
        assert!(errors.lock().is_empty());
        assert_eq!(head.stats().alive_workers, 0);
        // Nothing was forwarded to the unrelated tail stage
        assert_eq!(tail.stats().alive_workers, 1);

        tail.cancel();
        timeout(WAIT, tail.join()).await.unwrap();
    }

    // ============================================================
    // ACCOUNTING
    // ============================================================

    #[test]
    fn test_accounting_records_positive_delta() {
        let mut accounting = CycleAccounting::default();

        accounting.record(Duration::from_millis(10), 100, 150);
        accounting.record(Duration::from_millis(30), 150, 180);

        assert_eq!(accounting.busy_cycles, 2);
        assert_eq!(accounting.memory_use, 80);
        assert_eq!(accounting.average_memory(), 40);
        assert_eq!(accounting.average_busy_time(), Duration::from_millis(20));
    }

    #[test]
    fn test_accounting_uses_average_when_memory_shrank() {
        let mut accounting = CycleAccounting::default();
        accounting.record(Duration::ZERO, 0, 100);
        accounting.record(Duration::ZERO, 100, 300);

        // Reclamation during the cycle: charge the running average (150)
        accounting.record(Duration::ZERO, 500, 200);

        assert_eq!(accounting.busy_cycles, 3);
        assert_eq!(accounting.memory_use, 450);
    }

    #[test]
    fn test_accounting_first_cycle_shrinking_counts_zero() {
        let mut accounting = CycleAccounting::default();

        accounting.record(Duration::ZERO, 500, 200);

        assert_eq!(accounting.memory_use, 0);
        assert_eq!(accounting.busy_cycles, 1);
    }
}
