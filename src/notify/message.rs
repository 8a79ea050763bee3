//! Alert message formatting.

use crate::core::tracker::{Alert, AlertKind};

pub const THRESHOLD_TITLE: &str = "🚨 Radiosonde Alert 🚨";
pub const LANDING_TITLE: &str = "📍 Radiosonde Landing 📍";

/// A rendered notification
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub title: String,
    pub body: String,
}

pub fn render(alert: &Alert) -> Message {
    let record = &alert.record;
    let mut lines = vec![format!("Callsign: {}", record.device_id)];

    if let Some(model) = &record.meta.model {
        lines.push(format!("Model: {}", model));
    }
    if let Some(freq) = &record.meta.frequency {
        lines.push(format!("Frequency: {}", freq));
    }

    lines.push(format!("Location: {}", record.position));
    lines.push(format!("Altitude: {:.0} meters", record.altitude));
    if let Some(vel_v) = record.vel_v {
        lines.push(format!("Vertical speed: {:.1} m/s", vel_v));
    }
    lines.push(format!("Distance from Listener: {:.1} km", alert.distance_km));
    if let Some(batt) = record.meta.battery {
        lines.push(format!("Battery: {:.1} V", batt));
    }
    lines.push(format!(
        "Timestamp: {}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    let (title, summary) = match &alert.kind {
        AlertKind::Threshold => (
            THRESHOLD_TITLE,
            format!(
                "The radiosonde is descending within {} km and below {} meters altitude.",
                format_number(alert.range_km),
                format_number(alert.altitude_threshold_m)
            ),
        ),
        AlertKind::Landing { silent_for } => (
            LANDING_TITLE,
            format!(
                "No telemetry for {} minutes after descending below {} meters within {} km. Probable landing point.",
                silent_for.num_minutes(),
                format_number(alert.altitude_threshold_m),
                format_number(alert.range_km)
            ),
        ),
    };

    let body = format!(
        "{}\n\n{}\nClick the link to view the location on Google Maps: {}",
        lines.join("\n"),
        summary,
        record.position.maps_url()
    );

    Message {
        title: title.to_string(),
        body,
    }
}

/// Drop the fractional part of whole numbers (20.0 -> "20")
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
