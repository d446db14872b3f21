use clap::ArgMatches;
use clap::parser::ValueSource;
use std::path::PathBuf;

use crate::args::{PositiveU64, PositiveUsize, TesterArgs};
use crate::error::{AppError, AppResult, ConfigError};

use super::types::ConfigFile;

/// Applies configuration values to CLI arguments. Flags given explicitly on
/// the command line always win.
///
/// # Errors
///
/// Returns an error when a config value is out of range or malformed.
pub fn apply_config(
    args: &mut TesterArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "url")
        && let Some(url) = config.url.clone()
    {
        args.url = Some(url);
    }

    if !is_cli(matches, "file")
        && let Some(file) = config.file.as_ref()
    {
        args.file = Some(PathBuf::from(file));
    }

    if !is_cli(matches, "number")
        && let Some(number) = config.number
    {
        args.number = Some(ensure_positive_u64(number, "number")?);
    }

    if !is_cli(matches, "clients")
        && let Some(clients) = config.clients
    {
        args.clients = ensure_positive_usize(clients, "clients")?;
    }

    if !is_cli(matches, "duration")
        && let Some(duration) = config.duration.as_ref()
    {
        args.duration = Some(duration.to_duration("duration")?);
    }

    if !is_cli(matches, "rate")
        && let Some(rate) = config.rate
    {
        args.rate = Some(ensure_positive_u64(rate, "rate")?);
    }

    if !is_cli(matches, "connect_timeout")
        && let Some(timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = timeout.to_duration("connect_timeout")?;
    }

    if !is_cli(matches, "read_timeout")
        && let Some(timeout) = config.read_timeout.as_ref()
    {
        args.read_timeout = timeout.to_duration("read_timeout")?;
    }

    if !is_cli(matches, "write_timeout")
        && let Some(timeout) = config.write_timeout.as_ref()
    {
        args.write_timeout = timeout.to_duration("write_timeout")?;
    }

    if !is_cli(matches, "export_csv")
        && let Some(path) = config.export_csv.as_ref()
    {
        args.export_csv = Some(PathBuf::from(path));
    }

    if !is_cli(matches, "export_json")
        && let Some(path) = config.export_json.as_ref()
    {
        args.export_json = Some(PathBuf::from(path));
    }

    apply_flag(
        matches,
        "disable_keepalive",
        config.disable_keepalive,
        &mut args.disable_keepalive,
    );
    apply_flag(
        matches,
        "disable_compression",
        config.disable_compression,
        &mut args.disable_compression,
    );
    apply_flag(matches, "login", config.login, &mut args.login);
    apply_flag(
        matches,
        "show_errors",
        config.show_errors,
        &mut args.show_errors,
    );
    apply_flag(
        matches,
        "no_progress",
        config.no_progress,
        &mut args.no_progress,
    );
    apply_flag(matches, "verbose", config.verbose, &mut args.verbose);

    // NO_COLOR in the environment counts as explicit.
    if !is_cli(matches, "no_color")
        && matches.value_source("no_color") != Some(ValueSource::EnvVariable)
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }

    Ok(())
}

fn apply_flag(matches: &ArgMatches, name: &str, value: Option<bool>, target: &mut bool) {
    if !is_cli(matches, name)
        && let Some(value) = value
    {
        *target = value;
    }
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn ensure_positive_u64(value: u64, field: &str) -> AppResult<PositiveU64> {
    PositiveU64::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn ensure_positive_usize(value: usize, field: &str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}
