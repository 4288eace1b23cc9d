//! # CloudSift Core
//!
//! Orchestration engine for multi-account cloud resource scans.
//!
//! A scan fans out over three axes: member accounts reached through a
//! two-tier role chain, regions, and pluggable [`ports::Scanner`]s. Every
//! (account, region, scanner) triple becomes a [`types::ScanUnit`] executed
//! on a bounded [`pool::WorkerPool`]. Raw findings are run through the
//! operator's [`filter::IgnoreRules`] and collected per account and scanner
//! by the [`aggregate::ResultAggregator`].
//!
//! ## Architecture
//!
//! - [`credentials`]: base profile → organization role → scanner role
//!   resolution with graceful fallback
//! - [`registry`]: name → scanner lookup and selection
//! - [`expand`]: unit expansion, global-scope scanners run once per account
//! - [`pool`]: bounded executor with utilisation metrics
//! - [`progress`]: live view of running units and the periodic reporter
//! - [`orchestrator`]: the end-to-end scan
//! - [`output`]: result writers
//!
//! Cloud access is abstracted behind [`ports::SessionProvider`]; the core
//! never talks to a cloud API directly.

pub mod aggregate;
pub mod credentials;
pub mod error;
pub mod expand;
pub mod filter;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod pool;
pub mod ports;
pub mod progress;
pub mod registry;
pub mod types;

pub use error::{Result, SiftError};
pub use orchestrator::{ScanOrchestrator, ScanReport, ScanRequest};
