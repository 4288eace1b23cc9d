use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigLoadError;
use crate::util::{parse_csv, parse_duration, parse_number, parse_tags};

/// Raw configuration as defined in a TOML or JSON file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanners: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanner_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_unused: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
    /// Human readable duration, e.g. `"30s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub ignore: FileIgnoreConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileIgnoreConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_ids: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_names: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

pub const ENV_CONFIG_PATH: &str = "CLOUDSIFT_CONFIG";

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub regions: Option<Vec<String>>,
    pub scanners: Option<Vec<String>>,
    pub accounts: Option<Vec<String>>,
    pub organization_role: Option<String>,
    pub scanner_role: Option<String>,
    pub profile: Option<String>,
    pub days_unused: Option<u32>,
    pub max_workers: Option<usize>,
    pub progress_interval: Option<std::time::Duration>,
    pub output_dir: Option<PathBuf>,
    pub ignore_resource_ids: Option<Vec<String>>,
    pub ignore_resource_names: Option<Vec<String>>,
    pub ignore_tags: Option<BTreeMap<String, String>>,
}

impl EnvConfig {
    /// Read `CLOUDSIFT_*` variables from the process environment.
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name).filter(|value| !value.trim().is_empty())
        };
        let csv = |name: &str| var(name).map(|raw| parse_csv(&raw));
        let text = |name: &str| var(name).map(|raw| raw.trim().to_string());

        Ok(Self {
            config_path: var(ENV_CONFIG_PATH).map(PathBuf::from),
            regions: csv("CLOUDSIFT_REGIONS"),
            scanners: csv("CLOUDSIFT_SCANNERS"),
            accounts: csv("CLOUDSIFT_ACCOUNTS"),
            organization_role: text("CLOUDSIFT_ORGANIZATION_ROLE"),
            scanner_role: text("CLOUDSIFT_SCANNER_ROLE"),
            profile: text("CLOUDSIFT_PROFILE"),
            days_unused: var("CLOUDSIFT_DAYS_UNUSED")
                .map(|raw| parse_number("CLOUDSIFT_DAYS_UNUSED", &raw))
                .transpose()?,
            max_workers: var("CLOUDSIFT_MAX_WORKERS")
                .map(|raw| parse_number("CLOUDSIFT_MAX_WORKERS", &raw))
                .transpose()?,
            progress_interval: var("CLOUDSIFT_PROGRESS_INTERVAL")
                .map(|raw| parse_duration("CLOUDSIFT_PROGRESS_INTERVAL", &raw))
                .transpose()?,
            output_dir: var("CLOUDSIFT_OUTPUT_DIR").map(PathBuf::from),
            ignore_resource_ids: csv("CLOUDSIFT_IGNORE_RESOURCE_IDS"),
            ignore_resource_names: csv("CLOUDSIFT_IGNORE_RESOURCE_NAMES"),
            ignore_tags: var("CLOUDSIFT_IGNORE_TAGS")
                .map(|raw| parse_tags("CLOUDSIFT_IGNORE_TAGS", &raw))
                .transpose()?,
        })
    }

    /// Names of the settings this layer provides, for startup logging.
    pub fn provided_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        let mut mark = |present: bool, key: &'static str| {
            if present {
                keys.push(key);
            }
        };
        mark(self.regions.is_some(), "regions");
        mark(self.scanners.is_some(), "scanners");
        mark(self.accounts.is_some(), "accounts");
        mark(self.organization_role.is_some(), "organization_role");
        mark(self.scanner_role.is_some(), "scanner_role");
        mark(self.profile.is_some(), "profile");
        mark(self.days_unused.is_some(), "days_unused");
        mark(self.max_workers.is_some(), "max_workers");
        mark(self.progress_interval.is_some(), "progress_interval");
        mark(self.output_dir.is_some(), "output_dir");
        mark(self.ignore_resource_ids.is_some(), "ignore.resource_ids");
        mark(self.ignore_resource_names.is_some(), "ignore.resource_names");
        mark(self.ignore_tags.is_some(), "ignore.tags");
        keys
    }
}

/// Command-line overrides; highest precedence.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub regions: Option<Vec<String>>,
    pub scanners: Option<Vec<String>>,
    pub accounts: Option<Vec<String>>,
    pub organization_role: Option<String>,
    pub scanner_role: Option<String>,
    pub profile: Option<String>,
    pub days_unused: Option<u32>,
    pub max_workers: Option<usize>,
    pub progress_interval: Option<std::time::Duration>,
    pub output_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.regions.is_none()
            && self.scanners.is_none()
            && self.accounts.is_none()
            && self.organization_role.is_none()
            && self.scanner_role.is_none()
            && self.profile.is_none()
            && self.days_unused.is_none()
            && self.max_workers.is_none()
            && self.progress_interval.is_none()
            && self.output_dir.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> Result<EnvConfig, ConfigLoadError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn parses_lists_numbers_and_tags() {
        let config = env(&[
            ("CLOUDSIFT_REGIONS", "us-east-1,us-west-2"),
            ("CLOUDSIFT_MAX_WORKERS", "4"),
            ("CLOUDSIFT_PROGRESS_INTERVAL", "10s"),
            ("CLOUDSIFT_IGNORE_TAGS", "Env=dev,Keep=true"),
            ("CLOUDSIFT_PROFILE", "  "),
        ])
        .unwrap();

        assert_eq!(
            config.regions,
            Some(vec!["us-east-1".to_string(), "us-west-2".to_string()])
        );
        assert_eq!(config.max_workers, Some(4));
        assert_eq!(config.progress_interval, Some(Duration::from_secs(10)));
        assert_eq!(config.ignore_tags.as_ref().map(|t| t.len()), Some(2));
        assert_eq!(config.profile, None);
        assert_eq!(
            config.provided_keys(),
            vec!["regions", "max_workers", "progress_interval", "ignore.tags"]
        );
    }

    #[test]
    fn invalid_numbers_name_the_variable() {
        let err = env(&[("CLOUDSIFT_DAYS_UNUSED", "soon")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidValue { ref name, .. } if name == "CLOUDSIFT_DAYS_UNUSED"
        ));
    }
}
