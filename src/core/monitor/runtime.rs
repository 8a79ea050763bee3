//! Orchestrates the active listener and the purge loop.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Duration;

use super::{purge_task, record_handler, shared, SharedTracker, PURGE_INTERVAL};
use crate::core::tracker::{DeviceTracker, TrackerConfig};
use crate::error::Result;
use crate::listeners::{Listener, ListenerHandle};
use crate::notify::AlertSink;

/// Owns the shared tracker and runs one listener plus the purge loop.
pub struct Monitor {
    tracker: SharedTracker,
    sink: Arc<dyn AlertSink>,
    purge_interval: Duration,
}

enum Exit {
    Requested,
    ListenerEnded(Result<()>),
}

impl Monitor {
    pub fn new(config: TrackerConfig, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            tracker: shared(DeviceTracker::new(config)),
            sink,
            purge_interval: PURGE_INTERVAL,
        }
    }

    pub fn with_purge_interval(mut self, purge_interval: Duration) -> Self {
        self.purge_interval = purge_interval;
        self
    }

    pub fn tracker(&self) -> SharedTracker {
        self.tracker.clone()
    }

    /// Run until `shutdown` fires or the listener ends on its own.
    ///
    /// If the listener ends without being asked to (a bind failure, say) its
    /// result is returned once the purge loop has been stopped.
    pub async fn run(
        self,
        listener: Box<dyn Listener>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        let (purge_shutdown_tx, purge_shutdown_rx) = broadcast::channel(1);
        let purge = tokio::spawn(purge_task(
            self.tracker.clone(),
            self.sink.clone(),
            self.purge_interval,
            purge_shutdown_rx,
        ));

        let mut handle = ListenerHandle::start(
            listener,
            record_handler(self.tracker.clone(), self.sink.clone()),
        );
        log::info!("{} listener started", handle.kind());

        let exit = tokio::select! {
            _ = shutdown.recv() => Exit::Requested,
            result = handle.finished() => Exit::ListenerEnded(result),
        };

        let outcome = match exit {
            Exit::Requested => {
                log::info!("Shutdown requested, stopping {} listener", handle.kind());
                handle.stop().await
            }
            Exit::ListenerEnded(result) => result,
        };

        let _ = purge_shutdown_tx.send(());
        if let Err(e) = purge.await {
            log::error!("Purge task panicked: {}", e);
        }

        let tracked = self.tracker.lock().len();
        log::info!("Monitor stopped with {} radiosonde(s) tracked", tracked);

        outcome
    }
}
