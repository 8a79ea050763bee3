//! Telemetry transports.
//!
//! Each listener owns its connection and retry policy and reports canonical
//! records through a callback. Exactly one listener runs at a time, selected
//! by [`ListenerKind`].

pub mod mqtt;
pub mod udp;
pub mod web;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::core::config::{ListenerKind, Settings};
use crate::core::telemetry::TelemetryRecord;
use crate::error::{Result, SondeError};

pub use mqtt::MqttListener;
pub use udp::UdpListener;
pub use web::WebListener;

/// Called once per normalized record, in arrival order
pub type RecordCallback = Arc<dyn Fn(TelemetryRecord) + Send + Sync>;

#[async_trait]
pub trait Listener: Send {
    fn kind(&self) -> ListenerKind;

    /// Consume the transport until `shutdown` fires.
    ///
    /// Returns `Ok(())` on a requested shutdown; an `Err` means the listener
    /// could not run at all (for example the UDP port could not be bound).
    async fn listen(
        &mut self,
        on_record: RecordCallback,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<()>;
}

/// Construct the listener configured for `kind`.
pub fn build(kind: ListenerKind, settings: &Settings) -> Result<Box<dyn Listener>> {
    let listener: Box<dyn Listener> = match kind {
        ListenerKind::Udp => Box::new(UdpListener::new(settings.udp_broadcast.listen_port)),
        ListenerKind::Mqtt => Box::new(MqttListener::new()),
        ListenerKind::Web => Box::new(WebListener::new()?),
    };

    Ok(listener)
}

/// A listener running on a background task
pub struct ListenerHandle {
    kind: ListenerKind,
    shutdown_tx: broadcast::Sender<()>,
    join: JoinHandle<Result<()>>,
}

impl ListenerHandle {
    /// Spawn `listener` onto the current runtime.
    pub fn start(mut listener: Box<dyn Listener>, on_record: RecordCallback) -> Self {
        let kind = listener.kind();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let join = tokio::spawn(async move {
            let result = listener.listen(on_record, shutdown_rx).await;
            match &result {
                Ok(()) => log::info!("{} listener stopped", kind),
                Err(e) => log::error!("{} listener failed: {}", kind, e),
            }
            result
        });

        Self {
            kind,
            shutdown_tx,
            join,
        }
    }

    pub fn kind(&self) -> ListenerKind {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the listener task to end on its own.
    pub async fn finished(&mut self) -> Result<()> {
        (&mut self.join)
            .await
            .map_err(|e| SondeError::other(format!("{} listener task panicked: {}", self.kind, e)))?
    }

    /// Request shutdown and wait for the task to release its connection.
    /// Safe to call whether or not the listener ever connected.
    pub async fn stop(self) -> Result<()> {
        // Err only means the task already exited and dropped its receiver
        let _ = self.shutdown_tx.send(());
        self.join
            .await
            .map_err(|e| SondeError::other(format!("{} listener task panicked: {}", self.kind, e)))?
    }
}
