use crate::models::AlertSummary;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Stable alert key to the expiration timestamp it was last notified with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationLog {
    entries: BTreeMap<String, String>,
}

impl NotificationLog {
    /// Loads the log, dropping entries whose timestamp does not parse or is
    /// `expiry_hours` or more in the past relative to `now`.
    ///
    /// A missing or malformed file is an empty log.
    pub fn load(path: &Path, expiry_hours: u64, now: DateTime<Utc>) -> Self {
        let Some(raw) = read_snapshot(path) else {
            return Self::default();
        };

        let window = i64::try_from(expiry_hours)
            .ok()
            .and_then(TimeDelta::try_hours)
            .unwrap_or(TimeDelta::MAX);

        let total = raw.len();
        let entries: BTreeMap<String, String> = raw
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(marker) => Some((key, marker)),
                other => {
                    warn!(path = %path.display(), key = %key, value = %other, "dropping non-string log entry");
                    None
                }
            })
            .filter(|(_, marker)| {
                parse_marker(marker).is_some_and(|marked_at| now.signed_duration_since(marked_at) < window)
            })
            .collect();

        if entries.len() < total {
            debug!(
                path = %path.display(),
                retired = total - entries.len(),
                "retired stale notification log entries"
            );
        }

        Self { entries }
    }

    /// True only when `key` was notified with exactly this `version_marker`.
    pub fn has_current_version(&self, key: &str, version_marker: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|stored| stored == version_marker)
    }

    pub fn mark(&mut self, key: &str, version_marker: &str) {
        self.entries.insert(key.to_owned(), version_marker.to_owned());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        write_snapshot(path, &self.entries)
    }
}

/// Alerts considered in force as of the last successful cycle.
///
/// Rebuilt from scratch every cycle; keys that drop out relative to the
/// previous snapshot are the all-clear signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSet {
    entries: BTreeMap<String, AlertSummary>,
}

impl ActiveSet {
    /// A missing or malformed snapshot is an empty set. Entries that are not a
    /// complete summary are dropped one by one.
    pub fn load(path: &Path) -> Self {
        let Some(raw) = read_snapshot(path) else {
            return Self::default();
        };

        let entries = raw
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_value::<AlertSummary>(value) {
                Ok(summary) => Some((key, summary)),
                Err(error) => {
                    warn!(path = %path.display(), key = %key, error = %error, "dropping malformed active-set entry");
                    None
                }
            })
            .collect();

        Self { entries }
    }

    pub fn insert(&mut self, key: String, summary: AlertSummary) {
        self.entries.insert(key, summary);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&AlertSummary> {
        self.entries.get(key)
    }

    /// Entries of `self` that are absent from `current`.
    pub fn resolved_in<'a>(
        &'a self,
        current: &'a ActiveSet,
    ) -> impl Iterator<Item = (&'a String, &'a AlertSummary)> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| !current.contains(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        write_snapshot(path, &self.entries)
    }
}

/// `alert_log.json` keeps its active set in `alert_log.active.json`.
pub fn active_set_path(log_path: &Path) -> PathBuf {
    let stem = log_path
        .file_stem()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("alert_log"));
    let mut file_name = stem;
    file_name.push(".active.json");
    log_path.with_file_name(file_name)
}

fn parse_marker(marker: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(marker) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(marker, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Reads a snapshot as a JSON object; each caller validates entries itself.
fn read_snapshot(path: &Path) -> Option<BTreeMap<String, Value>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return None,
        Err(error) => {
            warn!(path = %path.display(), error = %error, "failed to read state file, starting empty");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(path = %path.display(), error = %error, "malformed state file, starting empty");
            None
        }
    }
}

/// Whole-file overwrite through a sibling temp file and a rename, so a crash
/// leaves either the old snapshot or the new one.
fn write_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let body = serde_json::to_string_pretty(value)?;
    let write_error = |source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }

    let mut tmp_name = path.file_name().map(OsString::from).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let mut file = File::create(&tmp_path).map_err(write_error)?;
    file.write_all(body.as_bytes()).map_err(write_error)?;
    file.sync_all().map_err(write_error)?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(write_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn missing_log_file_loads_empty() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(_) => return,
        };

        let log = NotificationLog::load(&dir.path().join("absent.json"), 12, noon());
        assert!(log.is_empty());
    }

    #[test]
    fn malformed_log_file_loads_empty() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(_) => return,
        };
        let path = dir.path().join("alert_log.json");
        assert!(fs::write(&path, "[1, 2").is_ok());

        assert!(NotificationLog::load(&path, 12, noon()).is_empty());
        assert!(ActiveSet::load(&path).is_empty());
    }

    #[test]
    fn load_retires_stale_and_unparsable_entries() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(_) => return,
        };
        let path = dir.path().join("alert_log.json");
        let body = r#"{
            "future": "2025-05-06T15:00:00-05:00",
            "recent": "2025-05-06T01:00:00Z",
            "naive": "2025-05-06T06:30:00",
            "stale": "2025-05-05T23:59:59+00:00",
            "garbage": "yesterday"
        }"#;
        assert!(fs::write(&path, body).is_ok());

        let log = NotificationLog::load(&path, 12, noon());

        assert_eq!(log.get("future"), Some("2025-05-06T15:00:00-05:00"));
        assert!(log.get("recent").is_some());
        assert!(log.get("naive").is_some());
        assert!(log.get("stale").is_none());
        assert!(log.get("garbage").is_none());
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn load_keeps_good_entries_next_to_bad_ones() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(_) => return,
        };
        let log_path = dir.path().join("alert_log.json");
        let log_body = r#"{"good": "2025-05-06T15:00:00Z", "bad": null, "number": 42}"#;
        assert!(fs::write(&log_path, log_body).is_ok());

        let log = NotificationLog::load(&log_path, 12, noon());

        assert_eq!(log.len(), 1);
        assert_eq!(log.get("good"), Some("2025-05-06T15:00:00Z"));

        let active_path = active_set_path(&log_path);
        let active_body = r#"{
            "full": {
                "event": "Flood Warning",
                "sender": "NWS Chicago",
                "expires": "2025-05-06T21:00:00Z",
                "headline": "Flood Warning until 4 PM"
            },
            "partial": {"event": "Flood Warning"},
            "scalar": "nope"
        }"#;
        assert!(fs::write(&active_path, active_body).is_ok());

        let active = ActiveSet::load(&active_path);

        assert_eq!(active.len(), 1);
        assert!(active.get("full").is_some_and(|summary| summary.sender == "NWS Chicago"));
        assert!(!active.contains("partial"));
    }

    #[test]
    fn version_check_is_exact_on_marker() {
        let mut log = NotificationLog::default();
        log.mark("k", "2025-05-06T15:00:00-05:00");

        assert!(log.has_current_version("k", "2025-05-06T15:00:00-05:00"));
        assert!(!log.has_current_version("k", "2025-05-06T16:00:00-05:00"));
        assert!(!log.has_current_version("other", "2025-05-06T15:00:00-05:00"));

        log.mark("k", "2025-05-06T16:00:00-05:00");
        assert!(log.has_current_version("k", "2025-05-06T16:00:00-05:00"));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn save_overwrites_whole_snapshot_and_leaves_no_temp_file() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(_) => return,
        };
        let path = dir.path().join("state").join("alert_log.json");

        let mut first = NotificationLog::default();
        first.mark("a", "2025-05-06T15:00:00Z");
        first.mark("b", "2025-05-06T15:00:00Z");
        assert!(first.save(&path).is_ok());

        let mut second = NotificationLog::default();
        second.mark("c", "2025-05-06T15:00:00Z");
        assert!(second.save(&path).is_ok());

        let reloaded = NotificationLog::load(&path, 12, noon());
        assert_eq!(reloaded, second);
        assert!(!dir.path().join("state").join("alert_log.json.tmp").exists());
    }

    #[test]
    fn active_set_survives_a_round_trip_and_reports_resolved_keys() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(_) => return,
        };
        let path = active_set_path(&dir.path().join("alert_log.json"));
        assert_eq!(path, dir.path().join("alert_log.active.json"));

        let summary = AlertSummary {
            event: "Tornado Warning".to_owned(),
            sender: "NWS Northern Indiana".to_owned(),
            expires: "2025-05-06T15:00:00-05:00".to_owned(),
            headline: "Tornado Warning issued".to_owned(),
        };
        let mut previous = ActiveSet::default();
        previous.insert("gone".to_owned(), summary.clone());
        previous.insert("kept".to_owned(), summary.clone());
        assert!(previous.save(&path).is_ok());

        let previous = ActiveSet::load(&path);
        let mut current = ActiveSet::default();
        current.insert("kept".to_owned(), summary.clone());

        assert_eq!(previous.get("kept"), Some(&summary));
        let resolved: Vec<_> = previous.resolved_in(&current).collect();
        assert_eq!(resolved, vec![(&"gone".to_owned(), &summary)]);
    }
}
