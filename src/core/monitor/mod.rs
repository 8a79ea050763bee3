//! Runtime wiring for the tracker.
//!
//! One listener task and one purge task share a single [`DeviceTracker`]
//! behind a mutex. The lock is taken for exactly one record or one sweep and
//! is released before alerts are handed to the sink.

mod purge;
mod runtime;

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::core::tracker::DeviceTracker;
use crate::listeners::RecordCallback;
use crate::notify::AlertSink;

pub use purge::{purge_task, run_sweep, PURGE_INTERVAL};
pub use runtime::Monitor;

/// Tracker shared between the listener callback and the purge loop
pub type SharedTracker = Arc<Mutex<DeviceTracker>>;

pub fn shared(tracker: DeviceTracker) -> SharedTracker {
    Arc::new(Mutex::new(tracker))
}

/// Callback that feeds each record into `tracker` and forwards any alert.
pub fn record_handler(tracker: SharedTracker, sink: Arc<dyn AlertSink>) -> RecordCallback {
    Arc::new(move |record| {
        let alert = tracker.lock().on_record(record, Utc::now());
        if let Some(alert) = alert {
            sink.dispatch(alert);
        }
    })
}
