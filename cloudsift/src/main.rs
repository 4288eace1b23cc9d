//! `cloudsift` command-line entry point.

mod cli;
mod inventory;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cloudsift_config::{ConfigLoad, ConfigLoader};
use cloudsift_core::ScanOrchestrator;
use cloudsift_core::logging::LogClock;
use cloudsift_core::output::{FilesystemJsonWriter, write_all};
use cloudsift_core::pool::init_shared_pool;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command, ScanArgs};
use inventory::{
    BUILTIN_SCANNERS, Inventory, InventoryProvider, builtin_registry,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let clock = Arc::new(LogClock::new());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cloudsift::progress=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(clock.layer())
        .init();

    let outcome = match cli.command {
        Command::Scanners => {
            list_scanners();
            Ok(())
        }
        Command::Scan(args) => run_scan(args, clock).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "Scan aborted");
            ExitCode::FAILURE
        }
    }
}

fn list_scanners() {
    for (name, label, global) in BUILTIN_SCANNERS {
        let scope = if *global { "global" } else { "regional" };
        println!("{name:<16}{label:<16}{scope}");
    }
}

async fn run_scan(args: ScanArgs, clock: Arc<LogClock>) -> anyhow::Result<()> {
    let mut loader = ConfigLoader::new().with_overrides(args.overrides());
    if let Some(path) = &args.config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = &args.env_file {
        loader = loader.with_env_file(path);
    }
    let ConfigLoad { config, sources } =
        loader.load().context("failed to load configuration")?;
    sources.log();
    info!(
        role_chaining = config.uses_role_chaining(),
        max_workers = config.max_workers,
        "Configuration loaded"
    );

    let inventory = Arc::new(Inventory::load(&args.inventory).await?);
    let pool = init_shared_pool(config.max_workers)?;
    let orchestrator = ScanOrchestrator::new(
        Arc::new(InventoryProvider::new(Arc::clone(&inventory))),
        builtin_registry(inventory)?,
        pool,
    )
    .with_log_clock(clock);

    let report = match orchestrator.run(&config.to_request()).await {
        Ok(report) => report,
        Err(err) if err.is_fatal() => return Err(err.into()),
        Err(err) => {
            error!(error = %err, "Scan failed");
            return Ok(());
        }
    };

    if report.accounts.is_empty() {
        warn!("No results to write");
        return Ok(());
    }

    let writer = FilesystemJsonWriter::new(&config.output_dir);
    let written = write_all(&writer, &report.accounts).await;
    info!(
        accounts = report.accounts.len(),
        written,
        results = report.total_results(),
        output_dir = %writer.dir().display(),
        "Reports written"
    );
    Ok(())
}
