use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use cloudsift_config::ConfigOverrides;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "cloudsift")]
#[command(
    about = "Find unused cloud resources across every account of an organization"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan accounts and write one JSON report per account
    Scan(ScanArgs),
    /// List the available scanners and exit
    Scanners,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ScanArgs {
    /// Inventory snapshot (JSON) describing the organization and resources
    #[arg(long)]
    pub inventory: PathBuf,

    /// Config file (TOML or JSON); defaults to $CLOUDSIFT_CONFIG or
    /// ./cloudsift.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Dotenv file to load before reading CLOUDSIFT_* variables
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Comma-separated regions to scan (default: all available)
    #[arg(long, value_delimiter = ',')]
    pub regions: Option<Vec<String>>,

    /// Comma-separated scanners to run (default: all)
    #[arg(long, value_delimiter = ',')]
    pub scanners: Option<Vec<String>>,

    /// Comma-separated account IDs to restrict the scan to
    #[arg(long, value_delimiter = ',')]
    pub accounts: Option<Vec<String>>,

    /// Role assumed from the base profile to list organization accounts
    #[arg(long)]
    pub organization_role: Option<String>,

    /// Role assumed in each member account to run scanners
    #[arg(long)]
    pub scanner_role: Option<String>,

    /// Base credentials profile
    #[arg(long)]
    pub profile: Option<String>,

    /// Report resources unused for at least this many days
    #[arg(long)]
    pub days_unused: Option<u32>,

    /// Maximum number of concurrently running scan units
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Interval between progress summaries, e.g. "30s"
    #[arg(long, value_parser = humantime::parse_duration)]
    pub progress_interval: Option<Duration>,

    /// Directory receiving <account_id>.json reports
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl ScanArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            regions: self.regions.clone(),
            scanners: self.scanners.clone(),
            accounts: self.accounts.clone(),
            organization_role: self.organization_role.clone(),
            scanner_role: self.scanner_role.clone(),
            profile: self.profile.clone(),
            days_unused: self.days_unused,
            max_workers: self.max_workers,
            progress_interval: self.progress_interval,
            output_dir: self.output_dir.clone(),
        }
    }
}
