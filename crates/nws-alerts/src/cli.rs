use crate::service::CycleError;
use clap::{ArgAction, Parser as ClapParser};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{EnvFilter, filter::Directive};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FATAL: i32 = 1;
/// The run completed its setup but no zone could be fetched.
pub const EXIT_FETCH_FAILED: i32 = 2;

#[derive(ClapParser, Debug, Clone)]
#[command(
    name = "nws-alerts",
    about = "Polls NWS active alerts for a site and posts new alerts and all-clears to a webhook"
)]
pub struct Options {
    #[arg(
        long = "config",
        value_name = "SITE_CONFIG_PATH",
        help = "Path to the site config JSON.",
        env = "NWS_ALERTS_CONFIG"
    )]
    pub config: PathBuf,
    #[arg(
        long = "log.level",
        default_value_t = Level::INFO,
        value_name = "LOG_LEVEL",
        env = "NWS_ALERTS_LOG_LEVEL",
        help = "The verbosity level used for logs.",
        long_help = "Possible values: info, debug, trace, warn, error"
    )]
    pub log_level: Level,
    #[arg(
        long = "interval-seconds",
        value_name = "SECONDS",
        env = "NWS_ALERTS_INTERVAL_SECONDS",
        help = "Keep running, starting a new cycle every SECONDS.",
        long_help = "Without this flag a single cycle runs and its outcome becomes the exit code."
    )]
    pub interval_seconds: Option<u64>,
    #[arg(
        long = "dry-run",
        action = ArgAction::SetTrue,
        help = "Log notifications instead of posting them. State files are still written."
    )]
    pub dry_run: bool,
}

pub fn init_tracing(opts: &Options) {
    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(opts.log_level))
        .from_env_lossy();

    let include_target = matches!(opts.log_level, Level::DEBUG | Level::TRACE);

    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_target(include_target)
        .init();
}

pub fn exit_code(error: &CycleError) -> i32 {
    match error {
        CycleError::AllZonesFailed(_) => EXIT_FETCH_FAILED,
        CycleError::Whitelist(_) | CycleError::Storage(_) => EXIT_FATAL,
    }
}
