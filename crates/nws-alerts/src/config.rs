use crate::{
    collector::{DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT},
    storage::active_set_path,
};
use serde::Deserialize;
use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

pub const DEFAULT_EXPIRY_HOURS: u64 = 12;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("config lists no areas to query")]
    NoZones,
    #[error("alert_expiry_hours must be greater than zero")]
    ZeroExpiry,
    #[error("webhook environment variable {0} is not set")]
    MissingWebhook(String),
}

/// Settings for one site, read once per run and shared by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub zones: Vec<String>,
    pub expiry_hours: u64,
    pub alert_type_file: PathBuf,
    pub alert_log_file: PathBuf,
    pub webhook_env_var: String,
    pub api_base_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct RawSiteConfig {
    #[serde(alias = "zones")]
    areas: Vec<String>,
    #[serde(default = "default_expiry_hours")]
    alert_expiry_hours: u64,
    alert_type_file: PathBuf,
    alert_log_file: PathBuf,
    webhook_env_var: String,
    api_base_url: Option<String>,
    user_agent: Option<String>,
    request_timeout_seconds: Option<u64>,
}

fn default_expiry_hours() -> u64 {
    DEFAULT_EXPIRY_HOURS
}

impl SiteConfig {
    /// Reads and validates a JSON site config. Relative file paths inside it
    /// are taken relative to the config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_json(&raw, base_dir).map_err(|error| match error {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(raw: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let parsed = serde_json::from_str::<RawSiteConfig>(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;

        let zones: Vec<String> = parsed
            .areas
            .into_iter()
            .map(|zone| zone.trim().to_owned())
            .filter(|zone| !zone.is_empty())
            .collect();
        if zones.is_empty() {
            return Err(ConfigError::NoZones);
        }
        if parsed.alert_expiry_hours == 0 {
            return Err(ConfigError::ZeroExpiry);
        }

        Ok(Self {
            zones,
            expiry_hours: parsed.alert_expiry_hours,
            alert_type_file: base_dir.join(parsed.alert_type_file),
            alert_log_file: base_dir.join(parsed.alert_log_file),
            webhook_env_var: parsed.webhook_env_var,
            api_base_url: parsed
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned()),
            user_agent: parsed
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
            request_timeout: parsed
                .request_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        })
    }

    pub fn active_set_file(&self) -> PathBuf {
        active_set_path(&self.alert_log_file)
    }

    pub fn webhook_url_from_env(&self) -> Result<String, ConfigError> {
        self.webhook_url(|name| env::var(name).ok())
    }

    /// Resolves the webhook destination through `lookup`, rejecting unset and
    /// blank values.
    pub fn webhook_url(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
        lookup(&self.webhook_env_var)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::MissingWebhook(self.webhook_env_var.clone()))
    }
}
