use std::ffi::OsString;
use std::path::Path;

use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tracing::{error, info};

use crate::app::{RunController, export_csv, export_json, print_summary, progress_sink};
use crate::args::{PositiveU64, TesterArgs};
use crate::config::{DEFAULT_CONFIG_FILES, apply_config, load_config};
use crate::domain::run::{RunConfig, StopCondition};
use crate::error::{AppError, AppResult, ValidationError};
use crate::http::{TransportFactory, TransportSettings};
use crate::requests::{RequestSet, RequestSpec, load_request_file, perform_login};


/// Parses arguments, installs logging, and runs one load test to completion.
///
/// # Errors
///
/// Returns an error for invalid flags, config files or request input, and
/// when the runtime or transport cannot be set up. Failed requests never
/// make this fail.
pub fn run() -> AppResult<()> {
    let Some((mut args, matches)) = parse_args()? else {
        return Ok(());
    };

    if let Some(config) = load_config(args.config.as_deref())? {
        apply_config(&mut args, &matches, &config)?;
    }

    crate::logger::init_logging(args.verbose, args.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(args))
}

fn parse_args() -> AppResult<Option<(TesterArgs, ArgMatches)>> {
    let mut cmd = TesterArgs::command();
    let raw_args: Vec<OsString> = std::env::args_os().collect();

    if should_show_help(&raw_args) {
        cmd.print_help()?;
        println!();
        return Ok(None);
    }

    let matches = cmd.get_matches_from(raw_args);
    let args = TesterArgs::from_arg_matches(&matches)?;
    Ok(Some((args, matches)))
}

fn should_show_help(raw_args: &[OsString]) -> bool {
    let treat_as_empty =
        matches!(raw_args, [] | [_]) || matches!(raw_args, [_, second] if second == "--");
    if !treat_as_empty {
        return false;
    }

    !DEFAULT_CONFIG_FILES
        .iter()
        .any(|path| Path::new(path).exists())
}

async fn run_async(args: TesterArgs) -> AppResult<()> {
    let config = build_run_config(&args)?;
    let settings = TransportSettings::from(&config);
    let factory = TransportFactory::new(settings)?;
    let requests = build_request_set(&args, settings).await?;

    info!("Preparing {} concurrent users.", config.workers);
    let outcome = RunController::new(config, requests, factory)
        .with_progress(progress_sink(args.no_progress, args.no_color))
        .watch_signals(true)
        .run()
        .await?;

    print_summary(&outcome.report, args.show_errors);

    if let Some(path) = args.export_csv.as_deref() {
        export_csv(path, &outcome.report).await?;
        info!("Wrote CSV samples to {}.", path.display());
    }
    if let Some(path) = args.export_json.as_deref() {
        export_json(path, &outcome.report).await?;
        info!("Wrote JSON report to {}.", path.display());
    }
    Ok(())
}

/// Resolves the flags into the immutable configuration of one run.
pub(crate) fn build_run_config(args: &TesterArgs) -> AppResult<RunConfig> {
    if args.url.is_none() && args.file.is_none() {
        error!("Missing target (set --url or --file).");
        return Err(AppError::validation(ValidationError::MissingTarget));
    }
    let stop = StopCondition::new(args.number.map(PositiveU64::get), args.duration)
        .map_err(|err| {
            error!("{}", err);
            AppError::validation(err)
        })?;

    let mut config = RunConfig::new(stop, args.clients.get());
    config.rate = args.rate.map(PositiveU64::get);
    config.keep_alive = !args.disable_keepalive;
    config.compression = !args.disable_compression;
    config.connect_timeout = args.connect_timeout;
    config.read_timeout = args.read_timeout;
    config.write_timeout = args.write_timeout;
    config.keep_samples = args.export_csv.is_some() || args.export_json.is_some();
    Ok(config)
}

/// File requests first, then `--url`. With `--login` the first file request
/// is spent on the login and never replayed.
pub(crate) async fn build_request_set(
    args: &TesterArgs,
    settings: TransportSettings,
) -> AppResult<RequestSet> {
    let mut specs = match args.file.as_deref() {
        Some(path) => load_request_file(path)?,
        None => Vec::new(),
    };

    if args.login {
        if args.file.is_none() {
            return Err(AppError::validation(ValidationError::LoginRequiresFile));
        }
        let mut remaining = specs.into_iter();
        let Some(login) = remaining.next() else {
            return Err(AppError::validation(ValidationError::LoginWithoutRequests));
        };
        specs = remaining.collect();
        if specs.is_empty() && args.url.is_none() {
            return Err(AppError::validation(ValidationError::LoginWithoutRequests));
        }

        let login_settings = TransportSettings {
            keep_alive: false,
            ..settings
        };
        let mut transport = TransportFactory::new(login_settings)?.transport();
        if let Some(prefix) = perform_login(&mut transport, &login).await {
            specs = specs
                .iter()
                .map(|spec| spec.with_cookie_prefix(&prefix))
                .collect::<Result<Vec<_>, _>>()?;
        }
    }

    if let Some(url) = args.url.as_deref() {
        specs.push(RequestSpec::from_url(url)?);
    }
    Ok(RequestSet::new(specs)?)
}
