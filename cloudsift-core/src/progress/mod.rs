//! Live view of running scan units and the periodic reporter built on it.

mod reporter;
mod tracker;

pub use reporter::{ProgressReporter, render_progress};
pub use tracker::{ProgressGuard, ProgressTracker, ScannerProgress};
