//! Alert delivery.
//!
//! Alerts leave the tracker through an [`AlertSink`]. The production sink,
//! [`Notifier`], renders each alert and POSTs it to every enabled webhook on a
//! background task, so record processing never waits on the network.

pub mod message;

use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::core::tracker::Alert;
use crate::error::{Result, SondeError};
pub use message::{render, Message};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Receiver of alerts raised by the tracker
pub trait AlertSink: Send + Sync {
    /// Hand an alert off for delivery. Implementations must return promptly.
    fn dispatch(&self, alert: Alert);
}

/// Result of delivering one message to every endpoint
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    title: &'a str,
    body: &'a str,
}

/// Webhook notifier for the configured endpoints
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    endpoints: Arc<Vec<Url>>,
}

impl Notifier {
    /// Build a notifier for `urls`. Every endpoint must be an http or https
    /// webhook.
    pub fn new(urls: &[String]) -> Result<Self> {
        let mut endpoints = Vec::with_capacity(urls.len());
        for raw in urls {
            let url = Url::parse(raw).map_err(|e| {
                SondeError::config(format!("Invalid notification URL '{}': {}", raw, e))
            })?;

            if !matches!(url.scheme(), "http" | "https") {
                return Err(SondeError::config(format!(
                    "Unsupported notification scheme '{}' in '{}'",
                    url.scheme(),
                    raw
                )));
            }
            endpoints.push(url);
        }

        if endpoints.is_empty() {
            log::warn!("No notification endpoints configured; alerts will only be logged");
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("sondewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoints: Arc::new(endpoints),
        })
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Deliver `message` to every endpoint concurrently. Failures are logged
    /// and counted, never returned.
    pub async fn send(&self, message: &Message) -> DeliveryReport {
        let payload = WebhookPayload {
            title: &message.title,
            body: &message.body,
        };

        let attempts = self.endpoints.iter().map(|endpoint| {
            let request = self.client.post(endpoint.clone()).json(&payload);
            async move {
                match request.send().await.and_then(|r| r.error_for_status()) {
                    Ok(_) => {
                        log::debug!(
                            "Notification delivered to {}",
                            endpoint.host_str().unwrap_or("?")
                        );
                        true
                    }
                    Err(e) => {
                        log::error!(
                            "Notification to {} failed: {}",
                            endpoint.host_str().unwrap_or("?"),
                            e
                        );
                        false
                    }
                }
            }
        });

        let results = join_all(attempts).await;
        let delivered = results.iter().filter(|ok| **ok).count();

        DeliveryReport {
            delivered,
            failed: results.len() - delivered,
        }
    }
}

impl AlertSink for Notifier {
    fn dispatch(&self, alert: Alert) {
        let message = render(&alert);
        log::info!("{}: {}", message.title, alert.record.device_id);

        if self.endpoints.is_empty() {
            return;
        }

        let notifier = self.clone();
        tokio::spawn(async move {
            let report = notifier.send(&message).await;
            if report.failed > 0 {
                log::warn!(
                    "Alert for {} reached {}/{} endpoints",
                    alert.record.device_id,
                    report.delivered,
                    report.delivered + report.failed
                );
            }
        });
    }
}
