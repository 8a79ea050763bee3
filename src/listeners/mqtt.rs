//! SondeHub MQTT listener.
//!
//! Connects to the public SondeHub reader over secure websockets and
//! subscribes to every sonde. Subscriptions are re-issued on each ConnAck
//! because the broker does not keep sessions for anonymous readers.

use async_trait::async_trait;
use chrono::Utc;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS, Transport};
use std::time::Duration;
use tokio::sync::broadcast;

use super::{Listener, RecordCallback};
use crate::core::config::ListenerKind;
use crate::core::telemetry::normalize_mqtt;
use crate::error::Result;

pub const SONDEHUB_BROKER_URL: &str = "wss://ws-reader.v2.sondehub.org:443/mqtt";
pub const SONDEHUB_PORT: u16 = 443;
pub const SONDEHUB_TOPIC: &str = "sondes/#";

/// Delay between reconnection attempts
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const REQUEST_CAPACITY: usize = 64;
/// SondeHub bursts can carry large payloads with extra telemetry fields
const MAX_PACKET_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub broker_url: String,
    pub port: u16,
    pub topic: String,
    pub reconnect_delay: Duration,
    /// Wrap the connection in TLS websockets; plain TCP otherwise
    pub secure_websocket: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_url: SONDEHUB_BROKER_URL.to_string(),
            port: SONDEHUB_PORT,
            topic: SONDEHUB_TOPIC.to_string(),
            reconnect_delay: RECONNECT_DELAY,
            secure_websocket: true,
        }
    }
}

pub struct MqttListener {
    config: MqttConfig,
}

impl MqttListener {
    pub fn new() -> Self {
        Self::with_config(MqttConfig::default())
    }

    pub fn with_config(config: MqttConfig) -> Self {
        Self { config }
    }

    fn connect(&self) -> (AsyncClient, EventLoop) {
        let client_id = format!(
            "sondewatch-{}-{}",
            std::process::id(),
            Utc::now().timestamp_millis() % 1_000_000
        );

        let mut opts = MqttOptions::new(client_id, &self.config.broker_url, self.config.port);
        opts.set_keep_alive(KEEP_ALIVE);
        opts.set_clean_session(true);
        opts.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);
        if self.config.secure_websocket {
            opts.set_transport(Transport::wss_with_default_config());
        }

        AsyncClient::new(opts, REQUEST_CAPACITY)
    }
}

impl Default for MqttListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Listener for MqttListener {
    fn kind(&self) -> ListenerKind {
        ListenerKind::Mqtt
    }

    async fn listen(
        &mut self,
        on_record: RecordCallback,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        let (client, mut eventloop) = self.connect();
        let delay = self.config.reconnect_delay;
        log::info!("Connecting to MQTT broker {}", self.config.broker_url);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    let _ = client.try_disconnect();
                    break;
                }
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        log::info!("Connected to MQTT broker, subscribing to {}", self.config.topic);
                        if let Err(e) = client.try_subscribe(&self.config.topic, QoS::AtMostOnce) {
                            log::error!("Failed to queue subscription to {}: {}", self.config.topic, e);
                        }
                    }
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        match normalize_mqtt(&publish.payload, Utc::now()) {
                            Ok(record) => on_record(record),
                            Err(e) => log::debug!("Discarding message on {}: {}", publish.topic, e),
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        log::warn!(
                            "MQTT connection lost ({}); reconnecting in {} seconds",
                            e,
                            delay.as_secs()
                        );
                        tokio::select! {
                            _ = shutdown.recv() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                },
            }
        }

        Ok(())
    }
}
