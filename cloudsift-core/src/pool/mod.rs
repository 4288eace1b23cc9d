//! Bounded worker pool shared by every scan in the process.
//!
//! Units are admitted through a semaphore sized to `max_workers`; anything
//! beyond that waits for a permit. A unit's `Err` is counted as a failure
//! and never aborts its siblings. Panics are caught at the task boundary and
//! counted the same way.

mod metrics;

pub use metrics::WorkerPoolMetrics;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use once_cell::sync::OnceCell;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::{Result, SiftError};
use metrics::MetricsState;

/// One unit of work. The unit logs its own failure before returning it.
pub type Task = BoxFuture<'static, Result<()>>;

/// Per-batch tally returned by [`WorkerPool::submit_batch`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Units handed to the pool.
    pub submitted: usize,
    /// Units that returned `Ok`.
    pub succeeded: usize,
    /// Units that errored or panicked.
    pub failed: usize,
}

/// Semaphore-bounded executor for scan units.
pub struct WorkerPool {
    max_workers: usize,
    permits: Arc<Semaphore>,
    metrics: Arc<MetricsState>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("max_workers", &self.max_workers)
            .field("available_permits", &self.permits.available_permits())
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

impl WorkerPool {
    /// Pool admitting at most `max_workers` concurrent units.
    pub fn new(max_workers: usize) -> Result<Self> {
        if max_workers == 0 {
            return Err(SiftError::InvalidConfig(
                "max_workers must be at least 1".into(),
            ));
        }
        Ok(Self {
            max_workers,
            permits: Arc::new(Semaphore::new(max_workers)),
            metrics: Arc::new(MetricsState::default()),
        })
    }

    /// Concurrency bound.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Cumulative metrics across every batch this pool has run.
    pub fn metrics(&self) -> WorkerPoolMetrics {
        self.metrics.snapshot()
    }

    /// Run every task, at most `max_workers` at a time, and return once all
    /// of them reached a terminal state. No ordering, no retries.
    pub async fn submit_batch(&self, tasks: Vec<Task>) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            submitted: tasks.len(),
            ..BatchOutcome::default()
        };
        self.metrics.add_submitted(tasks.len() as u64);

        let mut running = JoinSet::new();
        for task in tasks {
            let permits = Arc::clone(&self.permits);
            let metrics = Arc::clone(&self.metrics);
            running.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| SiftError::Internal("worker pool closed".into()))?;
                let mut active = ActiveWorker::enter(metrics);
                let result = task.await;
                active.succeeded = result.is_ok();
                result
            });
        }

        while let Some(joined) = running.join_next().await {
            match joined {
                Ok(Ok(())) => outcome.succeeded += 1,
                Ok(Err(err)) => {
                    debug!(error = %err, "scan unit finished with error");
                    outcome.failed += 1;
                }
                Err(join_err) => {
                    error!(error = %join_err, "scan unit aborted");
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }
}

/// Accounts for one running unit. Dropping it, including while unwinding
/// from a panic, ends the unit in the metrics.
struct ActiveWorker {
    metrics: Arc<MetricsState>,
    started: Instant,
    succeeded: bool,
}

impl ActiveWorker {
    fn enter(metrics: Arc<MetricsState>) -> Self {
        metrics.worker_started();
        Self {
            metrics,
            started: Instant::now(),
            succeeded: false,
        }
    }
}

impl Drop for ActiveWorker {
    fn drop(&mut self) {
        self.metrics
            .worker_finished(self.succeeded, self.started.elapsed());
    }
}

static SHARED_POOL: OnceCell<Arc<WorkerPool>> = OnceCell::new();

/// Initialise the process-wide pool. Repeating the call with the same size
/// returns the existing pool; a different size is rejected so a pool with
/// work in flight is never resized.
pub fn init_shared_pool(max_workers: usize) -> Result<Arc<WorkerPool>> {
    let pool = SHARED_POOL
        .get_or_try_init(|| WorkerPool::new(max_workers).map(Arc::new))?;
    if pool.max_workers() != max_workers {
        return Err(SiftError::PoolAlreadyInitialized {
            current: pool.max_workers(),
            requested: max_workers,
        });
    }
    Ok(Arc::clone(pool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn sleeping_task(ms: u64) -> Task {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<(), SiftError>(())
        })
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(matches!(
            WorkerPool::new(0),
            Err(SiftError::InvalidConfig(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_never_exceeds_max_workers() {
        let pool = WorkerPool::new(3).unwrap();
        let live = Arc::new(AtomicUsize::new(0));
        let high = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<Task> = (0..12)
            .map(|_| {
                let live = Arc::clone(&live);
                let high = Arc::clone(&high);
                Box::pin(async move {
                    let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                    high.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(15)).await;
                    live.fetch_sub(1, Ordering::SeqCst);
                    Ok::<(), SiftError>(())
                }) as Task
            })
            .collect();

        let outcome = pool.submit_batch(tasks).await;
        assert_eq!(outcome.succeeded, 12);
        assert!(high.load(Ordering::SeqCst) <= 3);

        let metrics = pool.metrics();
        assert_eq!(metrics.total_tasks, 12);
        assert_eq!(metrics.finished_tasks(), 12);
        assert_eq!(metrics.current_workers, 0);
        assert!(metrics.peak_workers <= 3);
        assert!(metrics.peak_workers >= 1);
        assert!(metrics.average_execution_ms > 0.0);
    }

    #[tokio::test]
    async fn failures_and_panics_do_not_abort_siblings() {
        let pool = WorkerPool::new(2).unwrap();
        let tasks: Vec<Task> = vec![
            sleeping_task(1),
            Box::pin(async {
                Err::<(), _>(SiftError::scanner("EBS Volumes", "boom"))
            }),
            Box::pin(async {
                if true {
                    panic!("scanner bug");
                }
                Ok::<(), SiftError>(())
            }),
            sleeping_task(1),
        ];

        let outcome = pool.submit_batch(tasks).await;
        assert_eq!(
            outcome,
            BatchOutcome {
                submitted: 4,
                succeeded: 2,
                failed: 2,
            }
        );

        let metrics = pool.metrics();
        assert_eq!(metrics.completed_tasks, 2);
        assert_eq!(metrics.failed_tasks, 2);
        assert_eq!(metrics.current_workers, 0);
    }

    #[tokio::test]
    async fn empty_batch_returns_immediately() {
        let pool = WorkerPool::new(1).unwrap();
        let outcome = pool.submit_batch(Vec::new()).await;
        assert_eq!(outcome.submitted, 0);
        assert_eq!(pool.metrics(), WorkerPoolMetrics::default());
    }

    #[test]
    fn shared_pool_is_initialised_once() {
        let first = init_shared_pool(5).expect("first init");
        let again = init_shared_pool(5).expect("same size is idempotent");
        assert!(Arc::ptr_eq(&first, &again));
        assert!(matches!(
            init_shared_pool(7),
            Err(SiftError::PoolAlreadyInitialized {
                current: 5,
                requested: 7
            })
        ));
    }
}
