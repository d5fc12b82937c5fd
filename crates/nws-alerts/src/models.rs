use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single alert as returned by one zone query of the feed.
///
/// Every field is optional because the feed omits or nulls fields freely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertRecord {
    pub id: Option<String>,
    pub event: Option<String>,
    pub onset: Option<String>,
    pub expires: Option<String>,
    pub sender_name: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub certainty: Option<String>,
    pub urgency: Option<String>,
    pub area_desc: Option<String>,
    pub web: Option<String>,
}

impl AlertRecord {
    pub fn event_name(&self) -> &str {
        self.event.as_deref().unwrap_or_default()
    }

    /// Parsed expiration time. `None` when missing or not RFC 3339.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.expires.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc))
    }

    pub fn summary(&self) -> AlertSummary {
        AlertSummary {
            event: self.event.clone().unwrap_or_default(),
            sender: self.sender_name.clone().unwrap_or_default(),
            expires: self.expires.clone().unwrap_or_default(),
            headline: self.headline.clone().unwrap_or_default(),
        }
    }
}

/// What the active-set snapshot remembers about an alert in force.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub event: String,
    pub sender: String,
    pub expires: String,
    pub headline: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// A new alert, or a new version of one already seen.
    Alert(AlertRecord),
    /// An alert that was active last cycle and is gone from the feed now.
    AllClear(AlertSummary),
}

/// Union of every zone query made during one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchBatch {
    pub records: Vec<AlertRecord>,
    pub succeeded_zones: Vec<String>,
    pub failed_zones: Vec<String>,
}

impl FetchBatch {
    pub fn any_succeeded(&self) -> bool {
        !self.succeeded_zones.is_empty()
    }
}
