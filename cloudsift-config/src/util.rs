use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::ConfigLoadError;

/// Split a comma separated list, dropping blank entries.
pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Parse `KEY=VALUE` pairs separated by commas. Values may contain `=`.
pub fn parse_tags(
    name: &str,
    raw: &str,
) -> Result<BTreeMap<String, String>, ConfigLoadError> {
    parse_csv(raw)
        .into_iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(ConfigLoadError::InvalidValue {
                name: name.to_string(),
                value: pair.clone(),
                reason: "expected KEY=VALUE".into(),
            }),
        })
        .collect()
}

pub fn parse_number<T>(name: &str, raw: &str) -> Result<T, ConfigLoadError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err: T::Err| ConfigLoadError::InvalidValue {
            name: name.to_string(),
            value: raw.to_string(),
            reason: err.to_string(),
        })
}

pub fn parse_duration(
    name: &str,
    raw: &str,
) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(raw.trim()).map_err(|err| {
        ConfigLoadError::InvalidValue {
            name: name.to_string(),
            value: raw.to_string(),
            reason: err.to_string(),
        }
    })
}
