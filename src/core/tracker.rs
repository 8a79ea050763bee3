//! Per-sonde state machine.
//!
//! The tracker is plain synchronous state: callers feed it records and sweep
//! ticks together with the current time, and it answers with the alerts that
//! should be sent. Sharing it between tasks and delivering alerts is the job
//! of [`crate::core::monitor`].

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::core::config::Settings;
use crate::core::geo::{distance_km, Coordinate};
use crate::core::telemetry::TelemetryRecord;
use crate::error::Result;

/// Entries silent for longer than this are dropped on the next sweep
pub const RETENTION_HOURS: i64 = 2;

/// Thresholds the state machine evaluates records against
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub home: Coordinate,
    pub distance_km: f64,
    pub altitude_threshold_m: f64,
    /// `None` disables landing alerts
    pub landing_timeout: Option<Duration>,
    pub retention: Duration,
}

impl TrackerConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let thresholds = &settings.notification_thresholds;
        let landing_timeout = match thresholds.landing_point_timeout_minutes {
            0 => None,
            minutes => Some(Duration::minutes(i64::from(minutes))),
        };

        Ok(Self {
            home: settings.home()?,
            distance_km: thresholds.distance_km,
            altitude_threshold_m: thresholds.altitude_meters,
            landing_timeout,
            retention: Duration::hours(RETENTION_HOURS),
        })
    }

    fn is_below_threshold(&self, altitude: f64) -> bool {
        altitude < self.altitude_threshold_m
    }

    fn distance_from_home(&self, position: Coordinate) -> f64 {
        distance_km(self.home, position)
    }
}

/// What an alert is about
#[derive(Debug, Clone, PartialEq)]
pub enum AlertKind {
    /// Descending, in range and below the altitude threshold
    Threshold,
    /// Silent near the ground for longer than the landing timeout
    Landing { silent_for: Duration },
}

/// An alert ready to be rendered and delivered
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    /// Record that triggered the alert (the last one heard, for landings)
    pub record: TelemetryRecord,
    pub distance_km: f64,
    pub range_km: f64,
    pub altitude_threshold_m: f64,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    pub fn is_landing(&self) -> bool {
        matches!(self.kind, AlertKind::Landing { .. })
    }
}

/// Tracked state for one sonde
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub notified_threshold: bool,
    pub notified_landing: bool,
    pub last_altitude: f64,
    pub last_seen: DateTime<Utc>,
    pub last_record: TelemetryRecord,
}

/// Outcome of one sweep tick
#[derive(Debug, Default)]
pub struct SweepReport {
    pub landings: Vec<Alert>,
    pub purged: Vec<String>,
}

/// Store of every sonde currently heard, keyed by device id
#[derive(Debug)]
pub struct DeviceTracker {
    config: TrackerConfig,
    devices: HashMap<String, DeviceState>,
}

impl DeviceTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            devices: HashMap::new(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Apply one record. Returns a threshold alert on the first record of each
    /// continuous descending + in-range + below-threshold run.
    pub fn on_record(&mut self, record: TelemetryRecord, now: DateTime<Utc>) -> Option<Alert> {
        let config = &self.config;

        let state = self
            .devices
            .entry(record.device_id.clone())
            .or_insert_with(|| {
                log::info!("New radiosonde detected: {}", record.device_id);
                DeviceState {
                    notified_threshold: false,
                    notified_landing: false,
                    last_altitude: 0.0,
                    last_seen: now,
                    last_record: record.clone(),
                }
            });

        let descending = record.altitude < state.last_altitude;
        let below = config.is_below_threshold(record.altitude);
        let distance = config.distance_from_home(record.position);
        let in_range = distance <= config.distance_km;

        let mut alert = None;
        if descending && below && in_range && !state.notified_threshold {
            log::info!(
                "Radiosonde {} is descending at {:.0} m, {:.1} km from home",
                record.device_id,
                record.altitude,
                distance
            );
            alert = Some(Alert {
                kind: AlertKind::Threshold,
                record: record.clone(),
                distance_km: distance,
                range_km: config.distance_km,
                altitude_threshold_m: config.altitude_threshold_m,
                raised_at: now,
            });
            state.notified_threshold = true;
        } else if !(descending && below && in_range) && state.notified_threshold {
            log::debug!(
                "Conditions no longer met for {}, re-arming threshold alert",
                record.device_id
            );
            state.notified_threshold = false;
        }

        state.last_altitude = record.altitude;
        state.last_seen = now;
        state.last_record = record;

        alert
    }

    /// Run landing detection and staleness eviction over every entry.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        let config = &self.config;

        if let Some(timeout) = config.landing_timeout {
            for (id, state) in self.devices.iter_mut() {
                let silent_for = now - state.last_seen;
                if silent_for <= timeout || state.notified_landing {
                    continue;
                }

                let record = &state.last_record;
                let distance = config.distance_from_home(record.position);
                if !config.is_below_threshold(record.altitude) || distance > config.distance_km {
                    continue;
                }

                log::info!(
                    "Radiosonde {} silent for {} min near {}, probable landing",
                    id,
                    silent_for.num_minutes(),
                    record.position
                );
                report.landings.push(Alert {
                    kind: AlertKind::Landing { silent_for },
                    record: record.clone(),
                    distance_km: distance,
                    range_km: config.distance_km,
                    altitude_threshold_m: config.altitude_threshold_m,
                    raised_at: now,
                });
                state.notified_landing = true;
            }
        }

        let retention = config.retention;
        self.devices.retain(|id, state| {
            let keep = now - state.last_seen <= retention;
            if !keep {
                log::info!(
                    "Purged radiosonde data for {} (silent for over {}h)",
                    id,
                    retention.num_hours()
                );
                report.purged.push(id.clone());
            }
            keep
        });

        report
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceState> {
        self.devices.get(device_id)
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.contains_key(device_id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
