use std::time::Duration;

use serde::Deserialize;

use crate::args::parsers::parse_duration;
use crate::error::{AppError, AppResult, ConfigError, ValidationError};

/// Keys accepted in `blitz.toml` / `blitz.json`. Each one mirrors a CLI flag.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub file: Option<String>,
    #[serde(alias = "requests")]
    pub number: Option<u64>,
    #[serde(alias = "concurrency")]
    pub clients: Option<usize>,
    pub duration: Option<DurationValue>,
    pub rate: Option<u64>,
    pub disable_keepalive: Option<bool>,
    pub disable_compression: Option<bool>,
    pub login: Option<bool>,
    pub connect_timeout: Option<DurationValue>,
    pub read_timeout: Option<DurationValue>,
    pub write_timeout: Option<DurationValue>,
    pub show_errors: Option<bool>,
    pub export_csv: Option<String>,
    pub export_json: Option<String>,
    pub no_progress: Option<bool>,
    pub no_color: Option<bool>,
    pub verbose: Option<bool>,
}

/// Either a bare number of seconds or a unit string such as `"750ms"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self, field: &str) -> AppResult<Duration> {
        let invalid = |source: ValidationError| {
            AppError::config(ConfigError::InvalidDuration {
                field: field.to_owned(),
                source,
            })
        };
        match self {
            DurationValue::Seconds(0) => Err(invalid(ValidationError::DurationZero)),
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => parse_duration(text).map_err(invalid),
        }
    }
}
