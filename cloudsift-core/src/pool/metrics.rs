//! Worker pool counters.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Point-in-time view of worker pool activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerPoolMetrics {
    /// Units admitted since the pool was created.
    pub total_tasks: u64,
    /// Units that returned `Ok`.
    pub completed_tasks: u64,
    /// Units that returned an error or panicked.
    pub failed_tasks: u64,
    /// Units holding a permit right now.
    pub current_workers: u64,
    /// Highest concurrent worker count observed.
    pub peak_workers: u64,
    /// Running mean over every unit that reached a terminal state.
    pub average_execution_ms: f64,
}

impl WorkerPoolMetrics {
    /// Completed plus failed units.
    pub fn finished_tasks(&self) -> u64 {
        self.completed_tasks + self.failed_tasks
    }

    /// Active workers as a percentage of `max_workers`.
    pub fn utilization_percent(&self, max_workers: usize) -> f64 {
        percent(self.current_workers, max_workers)
    }

    /// High-water mark as a percentage of `max_workers`.
    pub fn peak_utilization_percent(&self, max_workers: usize) -> f64 {
        percent(self.peak_workers, max_workers)
    }
}

fn percent(value: u64, max_workers: usize) -> f64 {
    if max_workers == 0 {
        return 0.0;
    }
    value as f64 / max_workers as f64 * 100.0
}

#[derive(Debug, Default)]
struct ExecutionStats {
    total: Duration,
    samples: u64,
}

/// Shared counters updated by every unit start/finish.
#[derive(Debug, Default)]
pub(crate) struct MetricsState {
    total_tasks: AtomicU64,
    completed_tasks: AtomicU64,
    failed_tasks: AtomicU64,
    current_workers: AtomicU64,
    peak_workers: AtomicU64,
    execution: Mutex<ExecutionStats>,
}

impl MetricsState {
    pub(crate) fn add_submitted(&self, count: u64) {
        self.total_tasks.fetch_add(count, Ordering::SeqCst);
    }

    pub(crate) fn worker_started(&self) {
        let now = self.current_workers.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_workers.fetch_max(now, Ordering::SeqCst);
    }

    pub(crate) fn worker_finished(&self, succeeded: bool, elapsed: Duration) {
        {
            let mut stats = self
                .execution
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            stats.total += elapsed;
            stats.samples += 1;
            let counter = if succeeded {
                &self.completed_tasks
            } else {
                &self.failed_tasks
            };
            counter.fetch_add(1, Ordering::SeqCst);
        }
        self.current_workers.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self) -> WorkerPoolMetrics {
        let stats = self
            .execution
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let average_execution_ms = if stats.samples == 0 {
            0.0
        } else {
            stats.total.as_secs_f64() * 1_000.0 / stats.samples as f64
        };

        WorkerPoolMetrics {
            total_tasks: self.total_tasks.load(Ordering::SeqCst),
            completed_tasks: self.completed_tasks.load(Ordering::SeqCst),
            failed_tasks: self.failed_tasks.load(Ordering::SeqCst),
            current_workers: self.current_workers.load(Ordering::SeqCst),
            peak_workers: self.peak_workers.load(Ordering::SeqCst),
            average_execution_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_tracks_terminal_units() {
        let state = MetricsState::default();
        state.add_submitted(2);
        state.worker_started();
        state.worker_started();
        state.worker_finished(true, Duration::from_millis(10));
        state.worker_finished(false, Duration::from_millis(30));

        let metrics = state.snapshot();
        assert_eq!(metrics.total_tasks, 2);
        assert_eq!(metrics.completed_tasks, 1);
        assert_eq!(metrics.failed_tasks, 1);
        assert_eq!(metrics.current_workers, 0);
        assert_eq!(metrics.peak_workers, 2);
        assert!((metrics.average_execution_ms - 20.0).abs() < 1e-6);
    }

    #[test]
    fn utilization_handles_zero_capacity() {
        let metrics = WorkerPoolMetrics {
            current_workers: 3,
            peak_workers: 4,
            ..Default::default()
        };
        assert_eq!(metrics.utilization_percent(0), 0.0);
        assert_eq!(metrics.utilization_percent(4), 75.0);
        assert_eq!(metrics.peak_utilization_percent(4), 100.0);
    }
}
