use crate::models::{AlertRecord, FetchBatch};
use reqwest::{Client, header::USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_API_BASE_URL: &str = "https://api.weather.gov";
pub const DEFAULT_USER_AGENT: &str = "weather-alert-script";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed feed body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of active alerts for one zone.
#[async_trait::async_trait]
pub trait ZoneFetcher: Send + Sync {
    async fn fetch_zone(&self, zone: &str) -> Result<Vec<AlertRecord>, CollectorError>;
}

#[derive(Debug, Clone)]
pub struct NwsCollector {
    client: Client,
    api_base_url: String,
    user_agent: String,
    timeout: Duration,
}

impl NwsCollector {
    pub fn new(api_base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_base_url,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl ZoneFetcher for NwsCollector {
    async fn fetch_zone(&self, zone: &str) -> Result<Vec<AlertRecord>, CollectorError> {
        let url = format!("{}/alerts/active", self.api_base_url.trim_end_matches('/'));
        let body = self
            .client
            .get(url)
            .query(&[("zone", zone)])
            .header(USER_AGENT, &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_features(&body)
    }
}

/// Decodes a GeoJSON `FeatureCollection` from the active-alerts endpoint.
pub fn parse_features(body: &str) -> Result<Vec<AlertRecord>, CollectorError> {
    let collection = serde_json::from_str::<FeatureCollection>(body)?;
    Ok(collection
        .features
        .into_iter()
        .map(Feature::into_record)
        .collect())
}

/// Queries every zone one after another and unions the results. A failed zone
/// contributes no records.
pub async fn collect_zones(fetcher: &impl ZoneFetcher, zones: &[String]) -> FetchBatch {
    let mut batch = FetchBatch::default();

    for zone in zones {
        match fetcher.fetch_zone(zone).await {
            Ok(records) => {
                info!(zone = %zone, count = records.len(), "fetched active alerts");
                batch.records.extend(records);
                batch.succeeded_zones.push(zone.clone());
            }
            Err(error) => {
                warn!(zone = %zone, error = %error, "alert fetch failed");
                batch.failed_zones.push(zone.clone());
            }
        }
    }

    batch
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    id: Option<String>,
    #[serde(default)]
    properties: FeatureProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureProperties {
    event: Option<String>,
    onset: Option<String>,
    expires: Option<String>,
    sender_name: Option<String>,
    headline: Option<String>,
    description: Option<String>,
    severity: Option<String>,
    certainty: Option<String>,
    urgency: Option<String>,
    area_desc: Option<String>,
    web: Option<String>,
}

impl Feature {
    fn into_record(self) -> AlertRecord {
        let properties = self.properties;
        AlertRecord {
            id: self.id,
            event: properties.event,
            onset: properties.onset,
            expires: properties.expires,
            sender_name: properties.sender_name,
            headline: properties.headline,
            description: properties.description,
            severity: properties.severity,
            certainty: properties.certainty,
            urgency: properties.urgency,
            area_desc: properties.area_desc,
            web: properties.web,
        }
    }
}
