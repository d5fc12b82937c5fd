use std::{
    collections::BTreeMap,
    fs,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{info, warn};

/// Event types written to a freshly created whitelist file, all disabled.
pub const DEFAULT_EVENT_TYPES: [&str; 38] = [
    "Flash Flood Warning",
    "Flash Flood Watch",
    "Flood Warning",
    "Flood Watch",
    "Tornado Warning",
    "Tornado Watch",
    "Severe Thunderstorm Warning",
    "Severe Thunderstorm Watch",
    "Winter Storm Warning",
    "Winter Storm Watch",
    "Blizzard Warning",
    "Ice Storm Warning",
    "Heat Advisory",
    "Excessive Heat Watch",
    "Extreme Heat Warning",
    "Extreme Heat Watch",
    "Air Quality Alert",
    "Red Flag Warning",
    "Dense Smoke Advisory",
    "Dust Storm Warning",
    "Extreme Wind Warning",
    "High Wind Warning",
    "High Wind Watch",
    "Snow Squall Warning",
    "Special Weather Statement",
    "Hazardous Weather Outlook",
    "Hurricane Watch",
    "Hurricane Warning",
    "Tropical Storm Watch",
    "Tropical Storm Warning",
    "Storm Surge Watch",
    "Storm Surge Warning",
    "Severe Weather Statement",
    "Coastal Flood Advisory",
    "Fire Weather Watch",
    "Child Abduction Emergency",
    "Civil Danger Warning",
    "Blue Alert",
];

#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error("failed to write default whitelist {path}: {source}")]
    Create { path: PathBuf, source: io::Error },
    #[error("failed to serialize whitelist: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Event-type name to enabled flag. Unknown event types are disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertTypeFilter {
    flags: BTreeMap<String, bool>,
}

impl AlertTypeFilter {
    pub fn from_flags(flags: BTreeMap<String, bool>) -> Self {
        Self { flags }
    }

    pub fn defaults() -> Self {
        let flags = DEFAULT_EVENT_TYPES
            .iter()
            .map(|event| ((*event).to_owned(), false))
            .collect();
        Self { flags }
    }

    /// Reads the whitelist at `path`, creating it with [`DEFAULT_EVENT_TYPES`]
    /// when absent. A file that cannot be read or parsed is left untouched and
    /// the defaults are used for this run.
    pub fn load_or_create(path: &Path) -> Result<Self, WhitelistError> {
        if !path.exists() {
            let defaults = Self::defaults();
            let body = serde_json::to_string_pretty(&defaults.flags)?;
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| WhitelistError::Create {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            fs::write(path, body).map_err(|source| WhitelistError::Create {
                path: path.to_path_buf(),
                source,
            })?;
            info!(path = %path.display(), "created default alert type whitelist");
            return Ok(defaults);
        }

        let parsed = fs::read_to_string(path)
            .map_err(|error| error.to_string())
            .and_then(|raw| {
                serde_json::from_str::<BTreeMap<String, bool>>(&raw).map_err(|error| error.to_string())
            });

        match parsed {
            Ok(flags) => Ok(Self { flags }),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "unreadable whitelist, using defaults");
                Ok(Self::defaults())
            }
        }
    }

    pub fn is_enabled(&self, event: &str) -> bool {
        self.flags.get(event).copied().unwrap_or(false)
    }

    pub fn enabled_events(&self) -> impl Iterator<Item = &str> {
        self.flags
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(event, _)| event.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_default_file_with_everything_disabled() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(_) => return,
        };
        let path = dir.path().join("alert_config.json");

        let filter_result = AlertTypeFilter::load_or_create(&path);
        assert!(filter_result.is_ok());
        let filter = match filter_result {
            Ok(filter) => filter,
            Err(_) => return,
        };

        assert!(path.exists());
        assert!(!filter.is_enabled("Tornado Warning"));
        assert_eq!(filter.enabled_events().count(), 0);

        let reloaded = AlertTypeFilter::load_or_create(&path);
        assert!(matches!(reloaded, Ok(ref reloaded) if *reloaded == filter));
    }

    #[test]
    fn reads_enabled_flags_from_existing_file() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(_) => return,
        };
        let path = dir.path().join("alert_config.json");
        let written = fs::write(&path, r#"{"Tornado Warning": true, "Heat Advisory": false}"#);
        assert!(written.is_ok());

        let filter = match AlertTypeFilter::load_or_create(&path) {
            Ok(filter) => filter,
            Err(_) => return,
        };

        assert!(filter.is_enabled("Tornado Warning"));
        assert!(!filter.is_enabled("Heat Advisory"));
        assert!(!filter.is_enabled("Blue Alert"));
    }

    #[test]
    fn malformed_file_falls_back_to_defaults_without_overwriting() {
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(_) => return,
        };
        let path = dir.path().join("alert_config.json");
        assert!(fs::write(&path, "{not json").is_ok());

        let filter = AlertTypeFilter::load_or_create(&path);
        assert!(matches!(filter, Ok(ref filter) if *filter == AlertTypeFilter::defaults()));
        assert!(matches!(fs::read_to_string(&path), Ok(ref raw) if raw == "{not json"));
    }
}
