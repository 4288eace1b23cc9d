//! Sinks for the final per-account result sets.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::{Result, SiftError};
use crate::types::AccountResultSet;

/// Persists one account's results.
#[async_trait]
pub trait ResultWriter: Send + Sync {
    /// Returns a human-readable location of what was written.
    async fn write(&self, results: &AccountResultSet) -> Result<String>;
}

/// Writes `<dir>/<account_id>.json` per account.
#[derive(Clone, Debug)]
pub struct FilesystemJsonWriter {
    dir: PathBuf,
}

impl FilesystemJsonWriter {
    /// Writer rooted at `dir`; created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File written for `account_id`.
    pub fn path_for(&self, account_id: &str) -> PathBuf {
        self.dir.join(format!("{account_id}.json"))
    }
}

#[async_trait]
impl ResultWriter for FilesystemJsonWriter {
    async fn write(&self, results: &AccountResultSet) -> Result<String> {
        let path = self.path_for(&results.account_id);
        let body = serde_json::to_vec_pretty(results)?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|source| {
            SiftError::Output {
                path: self.dir.clone(),
                source,
            }
        })?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| SiftError::Output {
                path: path.clone(),
                source,
            })?;

        Ok(path.display().to_string())
    }
}

/// Write every account, logging failures per account. Returns the number of
/// accounts written successfully.
pub async fn write_all(
    writer: &dyn ResultWriter,
    results: &[AccountResultSet],
) -> usize {
    let mut written = 0;
    for set in results {
        match writer.write(set).await {
            Ok(location) => {
                written += 1;
                info!(
                    account_id = %set.account_id,
                    account_name = %set.account_name,
                    results = set.total_results(),
                    location = %location,
                    "Wrote account results"
                );
            }
            Err(err) => {
                error!(
                    account_id = %set.account_id,
                    account_name = %set.account_name,
                    error = %err,
                    "Failed to write account results"
                );
            }
        }
    }
    written
}
