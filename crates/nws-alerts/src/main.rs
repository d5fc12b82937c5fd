use chrono::Utc;
use clap::Parser;
use nws_alerts::{
    alerter::{DryRunAlerter, Notifier, SlackAlerter},
    cli::{self, EXIT_FATAL, EXIT_OK, Options},
    collector::NwsCollector,
    config::SiteConfig,
    service::{CycleReport, run_cycle},
};
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let opts = Options::parse();
    cli::init_tracing(&opts);

    let code = run(opts).await;
    std::process::exit(code);
}

async fn run(opts: Options) -> i32 {
    let config = match SiteConfig::load(&opts.config) {
        Ok(config) => config,
        Err(error) => {
            error!(error = %error, config = %opts.config.display(), "invalid site config");
            return EXIT_FATAL;
        }
    };

    let collector = NwsCollector::new(config.api_base_url.clone())
        .with_user_agent(config.user_agent.clone())
        .with_timeout(config.request_timeout);

    info!(
        config = %opts.config.display(),
        zones = ?config.zones,
        dry_run = opts.dry_run,
        "checking alerts"
    );

    if opts.dry_run {
        return poll(&config, &collector, &DryRunAlerter, opts.interval_seconds).await;
    }

    let webhook_url = match config.webhook_url_from_env() {
        Ok(url) => url,
        Err(error) => {
            error!(error = %error, "webhook destination unavailable");
            return EXIT_FATAL;
        }
    };
    let alerter = SlackAlerter::new(webhook_url);

    poll(&config, &collector, &alerter, opts.interval_seconds).await
}

async fn poll(
    config: &SiteConfig,
    collector: &NwsCollector,
    notifier: &impl Notifier,
    interval_seconds: Option<u64>,
) -> i32 {
    let Some(seconds) = interval_seconds else {
        return match run_cycle(config, collector, notifier, Utc::now()).await {
            Ok(report) => {
                log_report(&report);
                EXIT_OK
            }
            Err(error) => {
                error!(error = %error, "alert cycle failed");
                cli::exit_code(&error)
            }
        };
    };

    info!(poll_seconds = seconds, "running continuously");
    let mut ticker = time::interval(Duration::from_secs(seconds.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match run_cycle(config, collector, notifier, Utc::now()).await {
            Ok(report) => log_report(&report),
            Err(error) => warn!(error = %error, "alert cycle failed"),
        }
    }
}

fn log_report(report: &CycleReport) {
    info!(
        zones_ok = report.zones_succeeded,
        zones_failed = report.zones_failed,
        fetched = report.records_fetched,
        notified = report.stats.notified,
        unchanged = report.stats.unchanged,
        excluded = report.stats.excluded,
        all_clears = report.stats.resolved,
        delivery_failures = report.deliveries_failed,
        active = report.active_alerts,
        "alert cycle complete"
    );
}
