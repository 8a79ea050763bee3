//! Periodic landing detection and eviction.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::SharedTracker;
use crate::core::tracker::SweepReport;
use crate::notify::AlertSink;

/// How often the store is swept
pub const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Sweep `tracker` once at `now` and hand landing alerts to `sink`.
pub fn run_sweep(tracker: &SharedTracker, sink: &dyn AlertSink, now: DateTime<Utc>) -> SweepReport {
    let report = tracker.lock().sweep(now);

    for alert in &report.landings {
        sink.dispatch(alert.clone());
    }

    report
}

/// Task that sweeps the tracker every `period` until shutdown.
///
/// The first sweep runs immediately.
pub async fn purge_task(
    tracker: SharedTracker,
    sink: std::sync::Arc<dyn AlertSink>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    log::debug!("Purge task started ({}s interval)", period.as_secs());

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = run_sweep(&tracker, sink.as_ref(), Utc::now());
                let remaining = tracker.lock().len();
                log::debug!(
                    "Sweep: {} landing alert(s), {} purged, {} tracked",
                    report.landings.len(),
                    report.purged.len(),
                    remaining
                );
            }
            _ = shutdown.recv() => {
                log::info!("Purge task stopped");
                break;
            }
        }
    }
}
