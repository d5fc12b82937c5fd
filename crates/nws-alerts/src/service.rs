use crate::{
    alerter::Notifier,
    collector::{ZoneFetcher, collect_zones},
    config::SiteConfig,
    models::NotificationEvent,
    reconciler::{ReconcileStats, reconcile},
    storage::{ActiveSet, NotificationLog, StorageError},
    whitelist::{AlertTypeFilter, WhitelistError},
};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("all {0} zone fetches failed, state left untouched")]
    AllZonesFailed(usize),
    #[error("whitelist error: {0}")]
    Whitelist(#[from] WhitelistError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub zones_succeeded: usize,
    pub zones_failed: usize,
    pub records_fetched: usize,
    pub stats: ReconcileStats,
    pub deliveries_failed: usize,
    pub active_alerts: usize,
}

/// Runs one full poll: load state, fetch every zone, reconcile, notify, and
/// overwrite both state files.
///
/// When no zone could be fetched the cycle stops before touching the log or
/// the active set, so an outage cannot turn into a burst of all-clears.
pub async fn run_cycle(
    config: &SiteConfig,
    fetcher: &impl ZoneFetcher,
    notifier: &impl Notifier,
    now: DateTime<Utc>,
) -> Result<CycleReport, CycleError> {
    let filter = AlertTypeFilter::load_or_create(&config.alert_type_file)?;
    debug!(enabled = ?filter.enabled_events().collect::<Vec<_>>(), "alert types enabled");
    let log = NotificationLog::load(&config.alert_log_file, config.expiry_hours, now);
    let active_set_file = config.active_set_file();
    let previous = ActiveSet::load(&active_set_file);

    let batch = collect_zones(fetcher, &config.zones).await;
    if !batch.any_succeeded() {
        return Err(CycleError::AllZonesFailed(batch.failed_zones.len()));
    }

    let plan = reconcile(&batch.records, &filter, log, &previous, now);

    let mut deliveries_failed = 0;
    for event in &plan.notifications {
        match notifier.send(event).await {
            Ok(()) => info!(kind = event_kind(event), event = event_name(event), "notification sent"),
            Err(error) => {
                deliveries_failed += 1;
                warn!(
                    kind = event_kind(event),
                    event = event_name(event),
                    error = %error,
                    "failed to send notification"
                );
            }
        }
    }

    plan.notification_log.save(&config.alert_log_file)?;
    plan.active_set.save(&active_set_file)?;

    Ok(CycleReport {
        zones_succeeded: batch.succeeded_zones.len(),
        zones_failed: batch.failed_zones.len(),
        records_fetched: batch.records.len(),
        stats: plan.stats,
        deliveries_failed,
        active_alerts: plan.active_set.len(),
    })
}

fn event_kind(event: &NotificationEvent) -> &'static str {
    match event {
        NotificationEvent::Alert(_) => "alert",
        NotificationEvent::AllClear(_) => "all_clear",
    }
}

fn event_name(event: &NotificationEvent) -> &str {
    match event {
        NotificationEvent::Alert(record) => record.event_name(),
        NotificationEvent::AllClear(summary) => &summary.event,
    }
}
