//! Source payload -> [`TelemetryRecord`] mapping.
//!
//! Three wire formats are understood:
//! - auto_rx `PAYLOAD_SUMMARY` UDP broadcasts
//! - SondeHub MQTT telemetry messages
//! - radiosondy.info GeoJSON live map exports

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{SondeMetadata, TelemetryRecord};
use crate::core::config::ListenerKind;
use crate::error::{Result, SondeError};

/// Message type accepted on the UDP broadcast port
pub const PAYLOAD_SUMMARY: &str = "PAYLOAD_SUMMARY";

/// Leading number of a value such as `"8021 m"` or `"-5.2 m/s"`. The number
/// must end at whitespace, the end of the string or a unit character, so
/// `"12,345 m"` and `"1.2e3 m"` do not match.
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([-+]?(?:\d+(?:\.\d*)?|\.\d+))(?:\s|$|[^\d.,eE])")
        .expect("static regex is valid")
});

/// auto_rx `PAYLOAD_SUMMARY` broadcast
#[derive(Debug, Deserialize)]
pub struct PayloadSummary {
    pub callsign: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    #[serde(default)]
    pub station: Option<String>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub freq: Option<String>,
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub sats: Option<u32>,
    #[serde(default)]
    pub batt: Option<f64>,
    #[serde(default)]
    pub snr: Option<f64>,
    #[serde(default)]
    pub frame: Option<u64>,
    #[serde(default)]
    pub vel_v: Option<f64>,
    #[serde(default)]
    pub vel_h: Option<f64>,
}

/// SondeHub telemetry message as published on `sondes/<serial>`
#[derive(Debug, Deserialize)]
pub struct SondehubTelemetry {
    pub serial: String,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub vel_v: Option<f64>,
    #[serde(default)]
    pub vel_h: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default, rename = "type")]
    pub sonde_type: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub frequency: Option<f64>,
    #[serde(default)]
    pub batt: Option<f64>,
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub sats: Option<u32>,
    #[serde(default)]
    pub snr: Option<f64>,
    #[serde(default)]
    pub frame: Option<u64>,
    #[serde(default)]
    pub uploader_callsign: Option<String>,
}

/// Normalize one UDP datagram.
///
/// Returns `Ok(None)` for well-formed JSON of another message type, and an
/// error for anything that is not a usable `PAYLOAD_SUMMARY`.
pub fn normalize_udp(data: &[u8], received: DateTime<Utc>) -> Result<Option<TelemetryRecord>> {
    let value: Value = serde_json::from_slice(data)?;

    match value.get("type").and_then(Value::as_str) {
        Some(PAYLOAD_SUMMARY) => {}
        _ => return Ok(None),
    }

    let packet: PayloadSummary = serde_json::from_value(value)?;

    let meta = SondeMetadata {
        // subtype is more specific (RS41-SG vs RS41) when present
        model: packet.subtype.or(packet.model),
        frequency: packet.freq,
        battery: packet.batt,
        temperature: packet.temp,
        humidity: packet.humidity,
        pressure: packet.pressure.filter(|p| *p >= 0.0),
        satellites: packet.sats,
        snr: packet.snr,
        frame: packet.frame,
        station: packet.station,
    };

    // Older auto_rx versions only send `speed` in km/h
    let vel_h = packet.vel_h.or(packet.speed.map(kmh_to_ms));

    let record = TelemetryRecord::new(
        packet.callsign,
        packet.latitude,
        packet.longitude,
        packet.altitude,
        ListenerKind::Udp,
    )?
    .with_timestamp(received)
    .with_velocity(packet.vel_v, vel_h)
    .with_heading(packet.heading)
    .with_meta(meta);

    Ok(Some(record))
}

/// Normalize one SondeHub MQTT message payload.
pub fn normalize_mqtt(payload: &[u8], received: DateTime<Utc>) -> Result<TelemetryRecord> {
    let msg: SondehubTelemetry = serde_json::from_slice(payload)?;

    let timestamp = msg
        .datetime
        .as_deref()
        .and_then(|dt| DateTime::parse_from_rfc3339(dt).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(received);

    let meta = SondeMetadata {
        model: msg.subtype.or(msg.sonde_type),
        frequency: msg.frequency.map(|f| format!("{:.3} MHz", f)),
        battery: msg.batt,
        temperature: msg.temp,
        humidity: msg.humidity,
        pressure: msg.pressure,
        satellites: msg.sats,
        snr: msg.snr,
        frame: msg.frame,
        station: msg.uploader_callsign,
    };

    Ok(
        TelemetryRecord::new(msg.serial, msg.lat, msg.lon, msg.alt, ListenerKind::Mqtt)?
            .with_timestamp(timestamp)
            .with_velocity(msg.vel_v, msg.vel_h)
            .with_heading(msg.heading)
            .with_meta(meta),
    )
}

/// Normalize a radiosondy.info feature collection.
///
/// Each feature is mapped on its own; features that cannot be mapped are
/// logged and skipped so one bad entry never drops the whole batch.
pub fn normalize_feature_collection(body: &Value, received: DateTime<Utc>) -> Vec<TelemetryRecord> {
    let Some(features) = body.get("features").and_then(Value::as_array) else {
        log::warn!("Web response has no 'features' array");
        return Vec::new();
    };

    let mut records = Vec::with_capacity(features.len());
    for (index, feature) in features.iter().enumerate() {
        match normalize_feature(feature, received) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => log::debug!("Skipping feature #{}: {}", index, e),
        }
    }

    records
}

/// Map one GeoJSON feature. Non-point features yield `Ok(None)`.
pub fn normalize_feature(
    feature: &Value,
    received: DateTime<Utc>,
) -> Result<Option<TelemetryRecord>> {
    let geometry_type = feature.pointer("/geometry/type").and_then(Value::as_str);
    if geometry_type != Some("Point") {
        return Ok(None);
    }

    let props = feature
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| SondeError::normalize("feature has no properties"))?;

    let device_id = ["number", "sonde_number", "id", "name"]
        .iter()
        .find_map(|key| text(props, key))
        .ok_or_else(|| SondeError::normalize("feature has no sonde identifier"))?;

    // GeoJSON coordinates are [lon, lat]; used when the properties lack them
    let coords = feature.pointer("/geometry/coordinates").and_then(Value::as_array);
    let lat = measurement(props, "latitude")
        .or_else(|| coords.and_then(|c| c.get(1)).and_then(Value::as_f64))
        .ok_or_else(|| SondeError::normalize(format!("{}: missing latitude", device_id)))?;
    let lon = measurement(props, "longitude")
        .or_else(|| coords.and_then(|c| c.first()).and_then(Value::as_f64))
        .ok_or_else(|| SondeError::normalize(format!("{}: missing longitude", device_id)))?;
    let altitude = measurement(props, "altitude")
        .ok_or_else(|| SondeError::normalize(format!("{}: missing altitude", device_id)))?;

    let meta = SondeMetadata {
        model: text(props, "type"),
        frequency: text(props, "frequency"),
        ..SondeMetadata::default()
    };

    let record = TelemetryRecord::new(device_id, lat, lon, altitude, ListenerKind::Web)?
        .with_timestamp(received)
        .with_velocity(
            measurement(props, "climbing"),
            measurement(props, "speed").map(kmh_to_ms),
        )
        .with_heading(measurement(props, "course"))
        .with_meta(meta);

    Ok(Some(record))
}

/// Parse a numeric property that may carry a unit suffix (`"8021 m"`,
/// `"78 km/h"`) or be a plain JSON number.
pub fn measurement(props: &Map<String, Value>, key: &str) -> Option<f64> {
    match props.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_with_unit(s),
        _ => None,
    }
}

/// Numeric prefix of a string with its unit suffix stripped.
pub fn parse_with_unit(raw: &str) -> Option<f64> {
    let captures = LEADING_NUMBER.captures(raw)?;
    captures[1].parse::<f64>().ok().filter(|v| v.is_finite())
}

fn text(props: &Map<String, Value>, key: &str) -> Option<String> {
    match props.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn kmh_to_ms(kmh: f64) -> f64 {
    kmh / 3.6
}
