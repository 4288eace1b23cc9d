//! Error type shared by the scan engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the scan engine.
#[derive(Error, Debug)]
pub enum SiftError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejected request or pool settings.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Every requested scanner name was unknown.
    #[error(
        "no valid scanners found and invalid scanners specified: {}",
        .0.join(", ")
    )]
    NoValidScanners(Vec<String>),

    /// The account allow-list matched nothing in the organization.
    #[error("none of the specified accounts exist in the organization")]
    NoRequestedAccounts {
        /// The allow-list as given.
        requested: Vec<String>,
    },

    /// The shared pool exists with a different size.
    #[error(
        "worker pool already initialised with {current} workers (requested {requested})"
    )]
    PoolAlreadyInitialized {
        /// Size of the existing pool.
        current: usize,
        /// Size asked for.
        requested: usize,
    },

    /// Two distinct scanner instances registered with one label.
    #[error(
        "scanner '{name}' reuses label '{label}' already registered as '{existing}'"
    )]
    DuplicateScannerLabel {
        /// The contested label.
        label: String,
        /// Name already holding the label.
        existing: String,
        /// Name being registered.
        name: String,
    },

    /// A provider session could not be created or used.
    #[error("Session error: {0}")]
    Session(String),

    /// An assumed session failed identity verification.
    #[error("Identity verification failed: {0}")]
    Identity(String),

    /// A scanner call failed for one unit.
    #[error("Scanner '{scanner}' failed: {message}")]
    Scanner {
        /// Label of the failing scanner.
        scanner: String,
        /// Provider error text.
        message: String,
    },

    /// Results arrived for an account that was never resolved.
    #[error("Unknown account in result set: {0}")]
    UnknownAccount(String),

    /// Writing a result file failed.
    #[error("failed to write results to {path}")]
    Output {
        /// File being written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A unit panicked inside the pool.
    #[error("Scan unit panicked: {0}")]
    Panicked(String),

    /// Invariant violation inside the engine.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SiftError {
    /// Whether this error must terminate the whole run rather than degrade
    /// it to a smaller effective scan.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SiftError::InvalidConfig(_)
                | SiftError::NoValidScanners(_)
                | SiftError::NoRequestedAccounts { .. }
                | SiftError::PoolAlreadyInitialized { .. }
                | SiftError::DuplicateScannerLabel { .. }
        )
    }

    /// Shorthand for [`SiftError::Scanner`].
    pub fn scanner(scanner: impl Into<String>, message: impl ToString) -> Self {
        SiftError::Scanner {
            scanner: scanner.into(),
            message: message.to_string(),
        }
    }
}

/// Result alias for the scan engine.
pub type Result<T> = std::result::Result<T, SiftError>;
