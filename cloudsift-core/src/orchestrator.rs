//! Scan orchestration: credential resolution, unit expansion, bounded
//! execution, filtering and aggregation for one scan invocation.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::aggregate::ResultAggregator;
use crate::credentials::{CredentialChain, CredentialResolver, ResolvedAccounts};
use crate::error::{Result, SiftError};
use crate::expand::expand;
use crate::filter::{IgnoreRules, filter};
use crate::logging::LogClock;
use crate::pool::{BatchOutcome, Task, WorkerPool, WorkerPoolMetrics};
use crate::ports::{ScanOptions, SessionProvider};
use crate::progress::{ProgressReporter, ProgressTracker};
use crate::registry::ScannerRegistry;
use crate::types::{AccountResultSet, ScanUnit};

/// Default minimum age of scanner findings, in days.
pub const DEFAULT_DAYS_UNUSED: u32 = 90;

/// Default tick of the progress reporter.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// Everything a single scan invocation needs, read once at scan start.
#[derive(Clone, Debug)]
pub struct ScanRequest {
    /// Credential chain inputs.
    pub credentials: CredentialChain,
    /// Requested regions; empty means every region the provider reports.
    pub regions: Vec<String>,
    /// Registry names of the scanners to run; empty means all.
    pub scanners: Vec<String>,
    /// Idle threshold forwarded to every scanner.
    pub days_unused: u32,
    /// Rules applied before aggregation.
    pub ignore: IgnoreRules,
    /// Period of the progress summary; must be non-zero.
    pub progress_interval: Duration,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            credentials: CredentialChain::default(),
            regions: Vec::new(),
            scanners: Vec::new(),
            days_unused: DEFAULT_DAYS_UNUSED,
            ignore: IgnoreRules::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Outcome of a scan invocation.
#[derive(Clone, Debug)]
pub struct ScanReport {
    /// Per-account results ordered by account id.
    pub accounts: Vec<AccountResultSet>,
    /// Labels of the scanners that ran.
    pub scanners: Vec<String>,
    /// Regions regional scanners ran in.
    pub regions: Vec<String>,
    /// Pool tally for the unit batch.
    pub units: BatchOutcome,
    /// Pool metrics snapshot taken after the batch drained.
    pub metrics: WorkerPoolMetrics,
    /// When account resolution began.
    pub started_at: DateTime<Utc>,
    /// When the last unit finished.
    pub finished_at: DateTime<Utc>,
    /// Wall-clock time of the run.
    pub duration: Duration,
}

impl ScanReport {
    fn empty(
        started_at: DateTime<Utc>,
        timer: Instant,
        pool: &WorkerPool,
    ) -> Self {
        Self {
            accounts: Vec::new(),
            scanners: Vec::new(),
            regions: Vec::new(),
            units: BatchOutcome::default(),
            metrics: pool.metrics(),
            started_at,
            finished_at: Utc::now(),
            duration: timer.elapsed(),
        }
    }

    /// Retained results across every account.
    pub fn total_results(&self) -> usize {
        self.accounts.iter().map(AccountResultSet::total_results).sum()
    }
}

/// Drives scans against a [`SessionProvider`] using scanners from a
/// [`ScannerRegistry`], on an injected [`WorkerPool`].
pub struct ScanOrchestrator<P: SessionProvider> {
    provider: Arc<P>,
    registry: Arc<ScannerRegistry<P::Session>>,
    pool: Arc<WorkerPool>,
    clock: Arc<LogClock>,
}

impl<P: SessionProvider> fmt::Debug for ScanOrchestrator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanOrchestrator")
            .field("provider", &std::any::type_name::<P>())
            .field("registry", &self.registry)
            .field("max_workers", &self.pool.max_workers())
            .finish()
    }
}

impl<P> ScanOrchestrator<P>
where
    P: SessionProvider + 'static,
{
    /// Orchestrator over `provider`, `registry` and a shared `pool`.
    pub fn new(
        provider: Arc<P>,
        registry: ScannerRegistry<P::Session>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            provider,
            registry: Arc::new(registry),
            pool,
            clock: Arc::new(LogClock::new()),
        }
    }

    /// Use `clock` for the progress reporter's quiescence check. It should
    /// be the clock wired into the process's tracing subscriber.
    pub fn with_log_clock(mut self, clock: Arc<LogClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Registered scanners.
    pub fn registry(&self) -> &ScannerRegistry<P::Session> {
        &self.registry
    }

    /// Pool units run on.
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Run one scan. Only configuration errors are returned; every other
    /// failure is logged and narrows the scan instead.
    pub async fn run(&self, request: &ScanRequest) -> Result<ScanReport> {
        let started_at = Utc::now();
        let timer = Instant::now();

        if request.progress_interval.is_zero() {
            return Err(SiftError::InvalidConfig(
                "progress interval must be greater than zero".into(),
            ));
        }

        let selection = self.registry.select(&request.scanners);
        if !selection.invalid.is_empty() {
            warn!(
                invalid = ?selection.invalid,
                available = ?self.registry.names(),
                "Ignoring invalid scanners"
            );
        }
        if selection.scanners.is_empty() {
            if !selection.invalid.is_empty() {
                return Err(SiftError::NoValidScanners(selection.invalid));
            }
            warn!("No scanners available, skipping scan");
            return Ok(ScanReport::empty(started_at, timer, &self.pool));
        }
        let labels: Vec<String> = selection
            .scanners
            .iter()
            .map(|s| s.label().to_string())
            .collect();

        let resolved = CredentialResolver::new(self.provider.as_ref())
            .resolve(&request.credentials)
            .await?;
        if resolved.is_empty() {
            warn!("No accounts to scan");
            return Ok(ScanReport::empty(started_at, timer, &self.pool));
        }

        let regions = match self.scan_regions(&resolved, &request.regions).await
        {
            Ok(regions) => regions,
            Err(err) => {
                error!(error = %err, "Failed to determine scan regions");
                return Ok(ScanReport::empty(started_at, timer, &self.pool));
            }
        };

        let aggregator = Arc::new(ResultAggregator::new(&resolved.accounts));
        let units = expand(&selection.scanners, &regions, &resolved.accounts);
        info!(
            scanners = ?labels,
            accounts = resolved.accounts.len(),
            regions = ?regions,
            units = units.len(),
            max_workers = self.pool.max_workers(),
            "Starting scan"
        );

        let tracker = Arc::new(ProgressTracker::new());
        let cancel = CancellationToken::new();
        let _stop_reporter = cancel.clone().drop_guard();
        let reporter = ProgressReporter::new(
            Arc::clone(&tracker),
            Arc::clone(&self.pool),
            Arc::clone(&self.clock),
            request.progress_interval,
        )
        .spawn(cancel.clone());

        let context = Arc::new(UnitContext {
            provider: Arc::clone(&self.provider),
            tracker,
            aggregator: Arc::clone(&aggregator),
            ignore: request.ignore.clone(),
            days_unused: request.days_unused,
        });
        let tasks = self.build_tasks(&context, units, &resolved);
        let outcome = self.pool.submit_batch(tasks).await;

        cancel.cancel();
        if let Err(err) = reporter.await {
            debug!(error = %err, "Progress reporter ended abnormally");
        }

        let metrics = self.pool.metrics();
        let duration = timer.elapsed();
        log_final_metrics(&outcome, &metrics, self.pool.max_workers(), duration);

        let accounts = aggregator.take_results();
        let report = ScanReport {
            accounts,
            scanners: labels,
            regions,
            units: outcome,
            metrics,
            started_at,
            finished_at: Utc::now(),
            duration,
        };
        info!(
            accounts = report.accounts.len(),
            results = report.total_results(),
            duration = %humantime::format_duration(round_millis(duration)),
            "Scan complete"
        );
        Ok(report)
    }

    async fn scan_regions(
        &self,
        resolved: &ResolvedAccounts<P::Session>,
        requested: &[String],
    ) -> Result<Vec<String>> {
        let account = resolved
            .accounts
            .first()
            .ok_or_else(|| SiftError::Internal("no resolved accounts".into()))?;
        let session = resolved.session(&account.id).ok_or_else(|| {
            SiftError::Internal(format!("no session for account {}", account.id))
        })?;

        let mut regions: Vec<String> = Vec::new();
        for region in requested.iter().map(|r| r.trim()) {
            if !region.is_empty() && !regions.iter().any(|r| r == region) {
                regions.push(region.to_string());
            }
        }

        if regions.is_empty() {
            let available = self.provider.available_regions(session).await?;
            info!(count = available.len(), "Discovered available regions");
            return Ok(available);
        }

        self.provider.validate_regions(session, &regions).await?;
        Ok(regions)
    }

    fn build_tasks(
        &self,
        context: &Arc<UnitContext<P>>,
        units: Vec<ScanUnit<P::Session>>,
        resolved: &ResolvedAccounts<P::Session>,
    ) -> Vec<Task> {
        units
            .into_iter()
            .filter_map(|unit| {
                let Some(session) = resolved.session(&unit.account.id) else {
                    warn!(
                        account_id = %unit.account.id,
                        scanner = unit.label(),
                        "No session for account, skipping unit"
                    );
                    return None;
                };
                let context = Arc::clone(context);
                let session = session.clone();
                Some(run_unit(context, unit, session).boxed())
            })
            .collect()
    }
}

struct UnitContext<P: SessionProvider> {
    provider: Arc<P>,
    tracker: Arc<ProgressTracker>,
    aggregator: Arc<ResultAggregator>,
    ignore: IgnoreRules,
    days_unused: u32,
}

async fn run_unit<P>(
    context: Arc<UnitContext<P>>,
    unit: ScanUnit<P::Session>,
    session: P::Session,
) -> Result<()>
where
    P: SessionProvider + 'static,
{
    let account = &unit.account;
    let scanner = unit.label().to_string();
    let region = unit.reported_region().to_string();

    debug!(
        account_id = %account.id,
        account_name = %account.name,
        region = %region,
        scanner = %scanner,
        "Starting scanner"
    );
    let progress =
        context
            .tracker
            .track(&account.id, &account.name, &region, &scanner);

    let session = match context
        .provider
        .regional_session(&session, &unit.region)
        .await
    {
        Ok(session) => session,
        Err(err) => {
            error!(
                account_id = %account.id,
                account_name = %account.name,
                region = %region,
                scanner = %scanner,
                error = %err,
                "Failed to create regional session"
            );
            return Err(err);
        }
    };

    let options = ScanOptions {
        region: unit.region.clone(),
        days_unused: context.days_unused,
        session,
    };
    let raw = match unit.scanner.scan(options).await {
        Ok(results) => results,
        Err(err) => {
            error!(
                account_id = %account.id,
                account_name = %account.name,
                region = %region,
                scanner = %scanner,
                error = %err,
                "Scanner failed"
            );
            return Err(err);
        }
    };

    let mut retained = filter(raw, &context.ignore, &scanner);
    progress.update_count(retained.len());
    for result in &mut retained {
        result
            .details
            .insert("region".into(), Value::String(region.clone()));
        result.account_id = account.id.clone();
        result.account_name = account.name.clone();
    }

    let count = retained.len();
    if let Err(err) = context.aggregator.append(&account.id, &scanner, retained)
    {
        error!(
            account_id = %account.id,
            scanner = %scanner,
            error = %err,
            "Failed to record results"
        );
        return Err(err);
    }

    info!(
        account_id = %account.id,
        account_name = %account.name,
        region = %region,
        scanner = %scanner,
        results = count,
        "Scanner completed"
    );
    Ok(())
}

fn log_final_metrics(
    outcome: &BatchOutcome,
    metrics: &WorkerPoolMetrics,
    max_workers: usize,
    duration: Duration,
) {
    let secs = duration.as_secs_f64();
    let finished = outcome.succeeded + outcome.failed;
    let tasks_per_sec = if secs > 0.0 {
        finished as f64 / secs
    } else {
        0.0
    };
    info!(
        total = outcome.submitted,
        completed = outcome.succeeded,
        failed = outcome.failed,
        tasks_per_sec = %format!("{tasks_per_sec:.1}"),
        avg_task_secs =
            %format!("{:.1}", metrics.average_execution_ms / 1000.0),
        peak_workers = metrics.peak_workers,
        peak_utilization =
            %format!("{:.0}%", metrics.peak_utilization_percent(max_workers)),
        "Worker pool metrics"
    );
}

fn round_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}
