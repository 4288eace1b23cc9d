//! Periodic progress summary.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::tracker::{ProgressTracker, ScannerProgress};
use crate::logging::{LogClock, PROGRESS_TARGET};
use crate::pool::{WorkerPool, WorkerPoolMetrics};

/// Periodically summarises running units while the log is otherwise quiet.
pub struct ProgressReporter {
    tracker: Arc<ProgressTracker>,
    pool: Arc<WorkerPool>,
    clock: Arc<LogClock>,
    interval: Duration,
    started: Instant,
}

impl ProgressReporter {
    pub fn new(
        tracker: Arc<ProgressTracker>,
        pool: Arc<WorkerPool>,
        clock: Arc<LogClock>,
        interval: Duration,
    ) -> Self {
        Self {
            tracker,
            pool,
            clock,
            interval,
            started: Instant::now(),
        }
    }

    /// Run the reporter until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + self.interval;
            let mut ticker = tokio::time::interval_at(start, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Some(lines) = self.tick() {
                            for line in lines {
                                info!(target: PROGRESS_TARGET, "{line}");
                            }
                        }
                    }
                }
            }
            debug!(target: PROGRESS_TARGET, "progress reporter stopped");
        })
    }

    /// Lines to print for this tick, or `None` when nothing is running or
    /// other log output appeared within the last interval.
    pub fn tick(&self) -> Option<Vec<String>> {
        let running = self.tracker.snapshot();
        if running.is_empty() || self.clock.idle_for() < self.interval {
            return None;
        }
        Some(render_progress(
            &running,
            &self.pool.metrics(),
            self.pool.max_workers(),
            self.started.elapsed(),
        ))
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("running", &self.tracker.len())
            .field("max_workers", &self.pool.max_workers())
            .field("interval", &self.interval)
            .finish()
    }
}

/// Render a progress summary. `running` is expected in snapshot order.
pub fn render_progress(
    running: &[ScannerProgress],
    metrics: &WorkerPoolMetrics,
    max_workers: usize,
    elapsed: Duration,
) -> Vec<String> {
    let active = metrics.current_workers as usize;
    let idle = max_workers.saturating_sub(active);

    let mut lines = Vec::with_capacity(running.len() + 2);
    lines.push(format!(
        "Pending Scanners (Workers: {active} active ({:.0}% utilized), {idle} idle of {max_workers} total):",
        metrics.utilization_percent(max_workers),
    ));

    for unit in running {
        lines.push(format!(
            "  {}: {} ({}) in {} - {} results found",
            unit.scanner,
            unit.account_name,
            unit.account_id,
            unit.region,
            unit.result_count,
        ));
    }

    let finished = metrics.finished_tasks();
    if finished > 0 {
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { finished as f64 / secs } else { 0.0 };
        lines.push(format!(
            "  Stats: {} completed, {} failed, {:.1} tasks/sec, avg {:.1}s per task",
            metrics.completed_tasks,
            metrics.failed_tasks,
            rate,
            metrics.average_execution_ms / 1000.0,
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(account: &str, scanner: &str, region: &str) -> ScannerProgress {
        ScannerProgress {
            account_id: account.to_string(),
            account_name: format!("acct-{account}"),
            region: region.to_string(),
            scanner: scanner.to_string(),
            result_count: 3,
        }
    }

    #[test]
    fn renders_header_units_and_stats() {
        let metrics = WorkerPoolMetrics {
            total_tasks: 10,
            completed_tasks: 4,
            failed_tasks: 1,
            current_workers: 2,
            peak_workers: 4,
            average_execution_ms: 1500.0,
        };
        let running = vec![
            unit("111", "EBS Volumes", "us-east-1"),
            unit("111", "IAM Roles", "global"),
        ];

        let lines =
            render_progress(&running, &metrics, 4, Duration::from_secs(10));

        assert_eq!(
            lines[0],
            "Pending Scanners (Workers: 2 active (50% utilized), 2 idle of 4 total):"
        );
        assert_eq!(
            lines[1],
            "  EBS Volumes: acct-111 (111) in us-east-1 - 3 results found"
        );
        assert_eq!(lines[2], "  IAM Roles: acct-111 (111) in global - 3 results found");
        assert_eq!(
            lines[3],
            "  Stats: 4 completed, 1 failed, 0.5 tasks/sec, avg 1.5s per task"
        );
    }

    #[test]
    fn omits_stats_before_first_completion() {
        let metrics = WorkerPoolMetrics {
            total_tasks: 2,
            current_workers: 1,
            ..WorkerPoolMetrics::default()
        };
        let lines = render_progress(
            &[unit("1", "EBS Volumes", "us-east-1")],
            &metrics,
            2,
            Duration::from_secs(1),
        );
        assert_eq!(lines.len(), 2);
        assert!(!lines.iter().any(|l| l.contains("Stats:")));
    }

    #[tokio::test]
    async fn tick_stays_quiet_while_logs_flow() {
        let tracker = Arc::new(ProgressTracker::new());
        let pool = Arc::new(WorkerPool::new(2).unwrap());
        let clock = Arc::new(LogClock::new());
        let reporter = ProgressReporter::new(
            Arc::clone(&tracker),
            pool,
            Arc::clone(&clock),
            Duration::from_millis(20),
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(reporter.tick().is_none(), "nothing running");

        tracker.start("1", "prod", "us-east-1", "EBS Volumes");
        clock.touch();
        assert!(reporter.tick().is_none(), "recent log output");

        tokio::time::sleep(Duration::from_millis(30)).await;
        let lines = reporter.tick().expect("quiet log, units running");
        assert!(lines[1].contains("EBS Volumes: prod (1) in us-east-1"));
    }

    #[tokio::test]
    async fn spawned_reporter_stops_on_cancel() {
        let reporter = ProgressReporter::new(
            Arc::new(ProgressTracker::new()),
            Arc::new(WorkerPool::new(1).unwrap()),
            Arc::new(LogClock::new()),
            Duration::from_millis(5),
        );
        let cancel = CancellationToken::new();
        let handle = reporter.spawn(cancel.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reporter exits after cancellation")
            .unwrap();
    }
}
