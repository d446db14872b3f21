use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use super::parsers::{parse_bool_env, parse_duration_arg, parse_positive_u64, parse_positive_usize};
use super::types::{PositiveU64, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "HTTP load generator: drives concurrent requests against one or more targets and reports latency, status and error tallies."
)]
pub struct TesterArgs {
    /// Target URL (issued as GET)
    #[arg(long, short = 'u', help_heading = "Common Options")]
    pub url: Option<String>,

    /// Request file: one tab-separated request per line (url, method, body/headers, headers)
    #[arg(long, short = 'f', help_heading = "Common Options")]
    pub file: Option<PathBuf>,

    /// Total number of requests to send
    #[arg(
        long,
        short = 'n',
        value_parser = parse_positive_u64,
        help_heading = "Common Options"
    )]
    pub number: Option<PositiveU64>,

    /// Number of concurrent clients
    #[arg(
        long,
        short = 'c',
        default_value = "100",
        value_parser = parse_positive_usize,
        help_heading = "Common Options"
    )]
    pub clients: PositiveUsize,

    /// Run duration (plain numbers are seconds; supports ms/s/m/h)
    #[arg(
        long,
        short = 'd',
        value_parser = parse_duration_arg,
        help_heading = "Common Options"
    )]
    pub duration: Option<Duration>,

    /// Dispatch rate limit in requests per second
    #[arg(long, short = 'r', value_parser = parse_positive_u64)]
    pub rate: Option<PositiveU64>,

    /// Disable keep-alive (open a new connection for every request)
    #[arg(long = "disable-keepalive")]
    pub disable_keepalive: bool,

    /// Disable compression (do not advertise gzip)
    #[arg(long = "disable-compression")]
    pub disable_compression: bool,

    /// Treat the first request of --file as a login and reuse its cookies
    #[arg(long, short = 'l', requires = "file")]
    pub login: bool,

    /// Timeout for establishing a new connection (supports ms/s/m/h)
    #[arg(
        long = "connect-timeout",
        default_value = "5s",
        value_parser = parse_duration_arg
    )]
    pub connect_timeout: Duration,

    /// Idle read timeout, renewed after every successful read (supports ms/s/m/h)
    #[arg(
        long = "read-timeout",
        default_value = "5s",
        value_parser = parse_duration_arg
    )]
    pub read_timeout: Duration,

    /// Idle write timeout, renewed after every successful write (supports ms/s/m/h)
    #[arg(
        long = "write-timeout",
        default_value = "5s",
        value_parser = parse_duration_arg
    )]
    pub write_timeout: Duration,

    /// Append the error tally to the report
    #[arg(long = "show-errors", short = 'e')]
    pub show_errors: bool,

    /// Write timestamped samples as CSV to this path
    #[arg(long = "export-csv")]
    pub export_csv: Option<PathBuf>,

    /// Write the report and timestamped samples as JSON to this path
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Disable the progress line
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    /// Disable color output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env)]
    pub no_color: bool,

    /// Enable verbose logging (sets log level to debug unless overridden by BLITZ_LOG/RUST_LOG)
    #[arg(long, short = 'v', help_heading = "Common Options")]
    pub verbose: bool,

    /// Path to config file (TOML/JSON). Defaults to ./blitz.toml or ./blitz.json if present.
    #[arg(long, help_heading = "Common Options")]
    pub config: Option<String>,
}
