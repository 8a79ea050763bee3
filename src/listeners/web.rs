//! radiosondy.info live map poller.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use url::Url;

use super::{Listener, RecordCallback};
use crate::core::config::ListenerKind;
use crate::core::telemetry::{normalize_feature_collection, TelemetryRecord};
use crate::error::{Result, SondeError};

pub const RADIOSONDY_EXPORT_URL: &str = "https://s1.radiosondy.info/export/export_map.php?live_map=1";
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
// The export endpoint rejects requests without a browser user agent
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

pub struct WebListener {
    client: reqwest::Client,
    endpoint: Url,
    poll_interval: Duration,
}

impl WebListener {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(RADIOSONDY_EXPORT_URL, POLL_INTERVAL)
    }

    pub fn with_endpoint(endpoint: &str, poll_interval: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            SondeError::config(format!("Invalid web endpoint '{}': {}", endpoint, e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            poll_interval,
        })
    }

    /// Endpoint with a cache-busting timestamp appended
    fn request_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("_", &Utc::now().timestamp_millis().to_string());
        url
    }

    /// Fetch the feature collection. `Ok(None)` for a non-success status.
    async fn fetch(&self) -> Result<Option<Value>> {
        let response = self.client.get(self.request_url()).send().await?;

        if !response.status().is_success() {
            log::error!(
                "Failed to fetch data from online source. Status code: {}",
                response.status()
            );
            return Ok(None);
        }

        Ok(Some(response.json::<Value>().await?))
    }

    /// One poll cycle. Every failure mode yields an empty batch.
    pub async fn poll_once(&self) -> Vec<TelemetryRecord> {
        match self.fetch().await {
            Ok(Some(body)) => {
                let records = normalize_feature_collection(&body, Utc::now());
                log::debug!("Fetched {} records from {}", records.len(), self.endpoint);
                records
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Polling {} failed: {}", self.endpoint, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Listener for WebListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::Web
    }

    async fn listen(
        &mut self,
        on_record: RecordCallback,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        log::info!(
            "Polling {} every {} seconds",
            self.endpoint,
            self.poll_interval.as_secs()
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    let records = tokio::select! {
                        _ = shutdown.recv() => break,
                        records = self.poll_once() => records,
                    };
                    for record in records {
                        on_record(record);
                    }
                }
            }
        }

        Ok(())
    }
}
