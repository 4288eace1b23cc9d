//! Configuration loading for CloudSift.
//!
//! Settings are layered, lowest precedence first: built-in defaults, a TOML
//! or JSON file, `CLOUDSIFT_*` environment variables (optionally seeded from
//! a `.env` file) and command-line overrides. [`ConfigSources`] records
//! which layers contributed so the binary can log them at startup.

pub mod error;
pub mod loader;
pub mod models;
pub mod sources;
pub mod util;

pub use error::ConfigLoadError;
pub use loader::{
    ConfigLoad, ConfigLoader, ConfigLoaderOptions, ConfigSource, ConfigSources,
};
pub use models::ScanConfig;
pub use sources::{ConfigOverrides, EnvConfig, FileConfig};
