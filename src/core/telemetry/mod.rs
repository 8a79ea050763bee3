//! Canonical telemetry model.
//!
//! Every transport turns its own payload format into a [`TelemetryRecord`]
//! through the functions in [`normalize`]; nothing downstream of the
//! listeners ever sees a source-specific payload.

pub mod normalize;

use chrono::{DateTime, Utc};

use crate::core::config::ListenerKind;
use crate::core::geo::Coordinate;
use crate::error::{Result, SondeError};

pub use normalize::{normalize_feature_collection, normalize_mqtt, normalize_udp};

/// Descriptive fields carried through for alert rendering only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SondeMetadata {
    pub model: Option<String>,
    pub frequency: Option<String>,
    pub battery: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub satellites: Option<u32>,
    pub snr: Option<f64>,
    pub frame: Option<u64>,
    /// Receiving station or uploader callsign
    pub station: Option<String>,
}

/// One normalized position update for one radiosonde
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    pub device_id: String,
    pub position: Coordinate,
    /// Metres above sea level
    pub altitude: f64,
    /// Vertical velocity in m/s, negative while descending
    pub vel_v: Option<f64>,
    /// Horizontal velocity in m/s
    pub vel_h: Option<f64>,
    pub heading: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub source: ListenerKind,
    pub meta: SondeMetadata,
}

impl TelemetryRecord {
    /// Build a record, rejecting empty ids, invalid positions and non-finite
    /// altitudes.
    pub fn new(
        device_id: impl Into<String>,
        lat: f64,
        lon: f64,
        altitude: f64,
        source: ListenerKind,
    ) -> Result<Self> {
        let device_id = device_id.into().trim().to_string();
        if device_id.is_empty() {
            return Err(SondeError::normalize("missing device identifier"));
        }

        if !altitude.is_finite() {
            return Err(SondeError::normalize(format!(
                "non-finite altitude for {}",
                device_id
            )));
        }

        Ok(Self {
            device_id,
            position: Coordinate::new(lat, lon)?,
            altitude,
            vel_v: None,
            vel_h: None,
            heading: None,
            timestamp: Utc::now(),
            source,
            meta: SondeMetadata::default(),
        })
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_velocity(mut self, vel_v: Option<f64>, vel_h: Option<f64>) -> Self {
        self.vel_v = vel_v.filter(|v| v.is_finite());
        self.vel_h = vel_h.filter(|v| v.is_finite());
        self
    }

    pub fn with_heading(mut self, heading: Option<f64>) -> Self {
        self.heading = heading.filter(|h| h.is_finite());
        self
    }

    pub fn with_meta(mut self, meta: SondeMetadata) -> Self {
        self.meta = meta;
        self
    }
}
