use crate::models::{AlertRecord, AlertSummary, NotificationEvent};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, event: &NotificationEvent) -> Result<(), AlertError>;
}

/// Posts `{"text": ...}` to an incoming-webhook URL.
#[derive(Debug, Clone)]
pub struct SlackAlerter {
    client: Client,
    webhook_url: String,
}

impl SlackAlerter {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SlackAlerter {
    async fn send(&self, event: &NotificationEvent) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&serde_json::json!({ "text": format_message(event) }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertError::Status { status, body });
        }

        Ok(())
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct DryRunAlerter;

#[async_trait::async_trait]
impl Notifier for DryRunAlerter {
    async fn send(&self, event: &NotificationEvent) -> Result<(), AlertError> {
        info!(message = %format_message(event), "dry run, notification not delivered");
        Ok(())
    }
}

pub fn format_message(event: &NotificationEvent) -> String {
    match event {
        NotificationEvent::Alert(record) => format_alert(record),
        NotificationEvent::AllClear(summary) => format_all_clear(summary),
    }
}

fn format_alert(record: &AlertRecord) -> String {
    let event = record.event.as_deref().filter(|event| !event.is_empty()).unwrap_or("Alert");
    let mut lines = vec![
        format!("*{event}*"),
        record.headline.clone().unwrap_or_default(),
        record.description.clone().unwrap_or_default(),
    ];

    let classifiers: Vec<String> = [
        ("Severity", &record.severity),
        ("Certainty", &record.certainty),
        ("Urgency", &record.urgency),
    ]
    .into_iter()
    .filter_map(|(label, value)| {
        value
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(|value| format!("{label}: {value}"))
    })
    .collect();
    if !classifiers.is_empty() {
        lines.push(classifiers.join(" | "));
    }

    if let Some(area) = record.area_desc.as_deref().filter(|area| !area.is_empty()) {
        lines.push(format!("Area: {area}"));
    }

    let non_empty = |link: &&str| !link.is_empty();
    if let Some(link) = record
        .web
        .as_deref()
        .filter(non_empty)
        .or(record.id.as_deref().filter(non_empty))
    {
        lines.push(format!("More info: {link}"));
    }

    lines.join("\n")
}

fn format_all_clear(summary: &AlertSummary) -> String {
    format!(
        "*All clear: {}*\n{}\nIssued by {}, previously in effect until {}",
        summary.event, summary.headline, summary.sender, summary.expires
    )
}
