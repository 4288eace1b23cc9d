use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use cloudsift_core::filter::IgnoreRules;
use once_cell::sync::Lazy;
use tracing::{debug, info};

use crate::error::ConfigLoadError;
use crate::models::ScanConfig;
use crate::sources::{ConfigOverrides, EnvConfig, FileConfig};
use crate::util::parse_duration;

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("cloudsift.toml"),
        PathBuf::from("cloudsift.json"),
        PathBuf::from("config/cloudsift.toml"),
    ]
});

/// Where the file layer of the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    /// No file was found; defaults, environment and flags only.
    #[default]
    Default,
    /// Passed explicitly, e.g. `--config`.
    Explicit(PathBuf),
    /// Named by `$CLOUDSIFT_CONFIG`.
    EnvPath(PathBuf),
    /// First existing default location.
    File(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Default => None,
            ConfigSource::Explicit(path)
            | ConfigSource::EnvPath(path)
            | ConfigSource::File(path) => Some(path),
        }
    }

    fn must_exist(&self) -> bool {
        matches!(self, ConfigSource::Explicit(_) | ConfigSource::EnvPath(_))
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Default => f.write_str("defaults"),
            ConfigSource::Explicit(path) => {
                write!(f, "{} (explicit)", path.display())
            }
            ConfigSource::EnvPath(path) => {
                write!(f, "{} ($CLOUDSIFT_CONFIG)", path.display())
            }
            ConfigSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Provenance of each configuration layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub file: ConfigSource,
    pub env_file_loaded: bool,
    pub env_keys: Vec<&'static str>,
    pub cli_overrides: bool,
}

impl ConfigSources {
    pub fn log(&self) {
        info!(
            file = %self.file,
            env_file = self.env_file_loaded,
            env = ?self.env_keys,
            cli = self.cli_overrides,
            "Loaded configuration"
        );
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: ScanConfig,
    pub sources: ConfigSources,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.options.overrides = overrides;
        self
    }

    /// Load `.env`, then compose defaults, file, process environment and
    /// overrides.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_with_env(EnvConfig::gather()?)?;
        load.sources.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Compose the configuration from an already gathered environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let source = self.resolve_source(&env);
        let file = match source.path() {
            Some(path) => {
                if !path.exists() {
                    if source.must_exist() {
                        return Err(ConfigLoadError::MissingConfig {
                            path: path.to_path_buf(),
                        });
                    }
                    None
                } else {
                    Some(read_file_config(path)?)
                }
            }
            None => None,
        };
        debug!(source = %source, "Resolved config file");

        let env_keys = env.provided_keys();
        let overrides = &self.options.overrides;

        let mut config = ScanConfig::default();
        if let Some(file) = file {
            apply_file(&mut config, file)?;
        }
        apply_env(&mut config, env);
        apply_overrides(&mut config, overrides.clone());
        config.validate()?;

        Ok(ConfigLoad {
            config,
            sources: ConfigSources {
                file: source,
                env_file_loaded: false,
                env_keys,
                cli_overrides: !overrides.is_empty(),
            },
        })
    }

    fn resolve_source(&self, env: &EnvConfig) -> ConfigSource {
        if let Some(explicit) = &self.options.config_path {
            return ConfigSource::Explicit(explicit.clone());
        }
        if let Some(from_env) = &env.config_path {
            return ConfigSource::EnvPath(from_env.clone());
        }
        DEFAULT_CONFIG_LOCATIONS
            .iter()
            .find(|candidate| candidate.exists())
            .cloned()
            .map(ConfigSource::File)
            .unwrap_or_default()
    }
}

/// Parse a config file, choosing the format by extension. Unknown
/// extensions try TOML first, then JSON.
pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let parse_toml = |contents: &str| {
        toml::from_str::<FileConfig>(contents).map_err(|source| {
            ConfigLoadError::ParseToml {
                path: path.to_path_buf(),
                source,
            }
        })
    };
    let parse_json = |contents: &str| {
        serde_json::from_str::<FileConfig>(contents).map_err(|source| {
            ConfigLoadError::ParseJson {
                path: path.to_path_buf(),
                source,
            }
        })
    };

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&contents),
        Some("toml") => parse_toml(&contents),
        _ => parse_toml(&contents).or_else(|_| parse_json(&contents)),
    }
}

fn apply_file(
    config: &mut ScanConfig,
    file: FileConfig,
) -> Result<(), ConfigLoadError> {
    set(&mut config.regions, file.regions);
    set(&mut config.scanners, file.scanners);
    set(&mut config.accounts, file.accounts);
    set_opt(&mut config.organization_role, file.organization_role);
    set_opt(&mut config.scanner_role, file.scanner_role);
    set_opt(&mut config.profile, file.profile);
    set(&mut config.days_unused, file.days_unused);
    set(&mut config.max_workers, file.max_workers);
    if let Some(raw) = file.progress_interval {
        config.progress_interval = parse_duration("progress_interval", &raw)?;
    }
    set(&mut config.output_dir, file.output_dir);

    let IgnoreRules {
        resource_ids,
        resource_names,
        tags,
    } = &mut config.ignore;
    set(resource_ids, file.ignore.resource_ids);
    set(resource_names, file.ignore.resource_names);
    set(tags, file.ignore.tags);
    Ok(())
}

fn apply_env(config: &mut ScanConfig, env: EnvConfig) {
    set(&mut config.regions, env.regions);
    set(&mut config.scanners, env.scanners);
    set(&mut config.accounts, env.accounts);
    set_opt(&mut config.organization_role, env.organization_role);
    set_opt(&mut config.scanner_role, env.scanner_role);
    set_opt(&mut config.profile, env.profile);
    set(&mut config.days_unused, env.days_unused);
    set(&mut config.max_workers, env.max_workers);
    set(&mut config.progress_interval, env.progress_interval);
    set(&mut config.output_dir, env.output_dir);
    if let Some(ids) = env.ignore_resource_ids {
        config.ignore.resource_ids = ids.into_iter().collect();
    }
    if let Some(names) = env.ignore_resource_names {
        config.ignore.resource_names = names.into_iter().collect();
    }
    set(&mut config.ignore.tags, env.ignore_tags);
}

fn apply_overrides(config: &mut ScanConfig, overrides: ConfigOverrides) {
    set(&mut config.regions, overrides.regions);
    set(&mut config.scanners, overrides.scanners);
    set(&mut config.accounts, overrides.accounts);
    set_opt(&mut config.organization_role, overrides.organization_role);
    set_opt(&mut config.scanner_role, overrides.scanner_role);
    set_opt(&mut config.profile, overrides.profile);
    set(&mut config.days_unused, overrides.days_unused);
    set(&mut config.max_workers, overrides.max_workers);
    set(&mut config.progress_interval, overrides.progress_interval);
    set(&mut config.output_dir, overrides.output_dir);
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn set_opt(slot: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        *slot = Some(value);
    }
}
