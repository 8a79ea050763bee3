use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use serde_json::{json, Value};
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;

use super::load_settings;
use crate::core::telemetry::normalize::PAYLOAD_SUMMARY;

/// Parameters of a simulated descent
#[derive(Debug, Clone)]
pub struct Descent {
    pub callsign: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_altitude: f64,
    pub descent_rate: f64,
}

impl Descent {
    /// Payload for the `frame`-th packet of the descent
    pub fn packet(&self, frame: u32) -> Value {
        let step = f64::from(frame);
        let altitude = (self.start_altitude - self.descent_rate * step).max(0.0);
        // Drift slowly south-east, about 10 m per packet
        let latitude = self.latitude - 0.0001 * step;
        let longitude = self.longitude + 0.0001 * step;

        json!({
            "type": PAYLOAD_SUMMARY,
            "station": "SIMULATOR",
            "callsign": self.callsign,
            "latitude": latitude,
            "longitude": longitude,
            "altitude": altitude,
            "speed": 72.2,
            "heading": 124.9,
            "time": Utc::now().format("%H:%M:%S").to_string(),
            "comment": "Radiosonde",
            "model": "RS41",
            "subtype": "RS41-SG",
            "freq": "403.9990 MHz",
            "temp": -15.4,
            "frame": 6031 + frame,
            "humidity": 62.8,
            "pressure": -1,
            "sats": 9,
            "batt": 2.7,
            "snr": 11.3,
            "vel_v": -self.descent_rate,
            "vel_h": 20.05,
        })
    }
}

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let settings = load_settings(matches)?;

    let host = matches
        .get_one::<String>("host")
        .context("Host argument is required")?;
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .unwrap_or(settings.udp_broadcast.listen_port);
    let count = *matches
        .get_one::<u32>("count")
        .context("Count argument is required")?;
    let interval_ms = *matches
        .get_one::<u64>("interval-ms")
        .context("Interval argument is required")?;

    let descent = Descent {
        callsign: matches
            .get_one::<String>("callsign")
            .context("Callsign argument is required")?
            .clone(),
        latitude: settings.listener_location.latitude,
        longitude: settings.listener_location.longitude,
        start_altitude: *matches
            .get_one::<f64>("start-altitude")
            .context("Start altitude argument is required")?,
        descent_rate: *matches
            .get_one::<f64>("descent-rate")
            .context("Descent rate argument is required")?,
    };

    let socket = UdpSocket::bind("0.0.0.0:0").context("Failed to open UDP socket")?;
    socket.set_broadcast(true)?;
    let target = format!("{}:{}", host, port);

    println!(
        "{} {} ({} packets)",
        "Simulating radiosonde descent to".cyan(),
        target.yellow(),
        count
    );

    for frame in 0..count {
        let packet = descent.packet(frame);
        let data = serde_json::to_vec(&packet)?;
        socket
            .send_to(&data, &target)
            .with_context(|| format!("Failed to send packet to {}", target))?;

        println!(
            "  {} {} alt {:.0} m",
            "Sent".green(),
            descent.callsign,
            packet["altitude"].as_f64().unwrap_or_default()
        );

        if frame + 1 < count {
            thread::sleep(Duration::from_millis(interval_ms));
        }
    }

    Ok(())
}
