//! Decides, for one polling cycle, which alerts to announce, which are already
//! known, and which have dropped out of the feed since the previous cycle.
//!
//! Nothing here performs I/O. The caller loads the persisted state, hands it
//! in together with the fetched records, and persists whatever comes back.

use crate::{
    identity::build_key,
    models::{AlertRecord, NotificationEvent},
    storage::{ActiveSet, NotificationLog},
    whitelist::AlertTypeFilter,
};
use chrono::{DateTime, Utc};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    NotWhitelisted,
    MissingExpiry,
    Expired,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub notified: usize,
    pub unchanged: usize,
    pub excluded: usize,
    pub resolved: usize,
}

/// Outcome of reconciling one cycle: what to send and what to persist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CyclePlan {
    /// New or changed alerts first, then all-clears.
    pub notifications: Vec<NotificationEvent>,
    pub notification_log: NotificationLog,
    pub active_set: ActiveSet,
    pub stats: ReconcileStats,
}

/// Why `record` can never enter the active set this cycle, if it can't.
pub fn exclusion(record: &AlertRecord, filter: &AlertTypeFilter, now: DateTime<Utc>) -> Option<Exclusion> {
    if !filter.is_enabled(record.event_name()) {
        return Some(Exclusion::NotWhitelisted);
    }

    match record.expires_at() {
        None => Some(Exclusion::MissingExpiry),
        Some(expires_at) if expires_at < now => Some(Exclusion::Expired),
        Some(_) => None,
    }
}

/// Builds the next active set from scratch out of `records`, announcing every
/// key whose expiration differs from what the log last saw, and an all-clear
/// for every key of `previous` that is not active anymore.
///
/// Announced keys are marked in the returned log whether or not delivery later
/// succeeds. Resolved keys keep their log entry until it ages out.
pub fn reconcile(
    records: &[AlertRecord],
    filter: &AlertTypeFilter,
    log: NotificationLog,
    previous: &ActiveSet,
    now: DateTime<Utc>,
) -> CyclePlan {
    let mut plan = CyclePlan {
        notification_log: log,
        ..Default::default()
    };

    for record in records {
        if let Some(reason) = exclusion(record, filter, now) {
            debug!(event = record.event_name(), ?reason, "alert excluded");
            plan.stats.excluded += 1;
            continue;
        }

        let key = build_key(record);
        let version = record.expires.as_deref().unwrap_or_default();
        plan.active_set.insert(key.clone(), record.summary());

        if plan.notification_log.has_current_version(&key, version) {
            debug!(key = %key, "alert version already notified");
            plan.stats.unchanged += 1;
            continue;
        }

        plan.notification_log.mark(&key, version);
        plan.notifications.push(NotificationEvent::Alert(record.clone()));
        plan.stats.notified += 1;
    }

    let all_clears: Vec<NotificationEvent> = previous
        .resolved_in(&plan.active_set)
        .map(|(key, summary)| {
            debug!(key = %key, "alert no longer active");
            NotificationEvent::AllClear(summary.clone())
        })
        .collect();
    plan.stats.resolved = all_clears.len();
    plan.notifications.extend(all_clears);

    plan
}
