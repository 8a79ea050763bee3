use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::geo::Coordinate;
use crate::error::{Result, SondeError};

/// Transport the tracker reads telemetry from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListenerKind {
    /// Local auto_rx UDP broadcast
    #[serde(rename = "UDP")]
    Udp,
    /// SondeHub MQTT feed
    #[serde(rename = "MQTT")]
    Mqtt,
    /// radiosondy.info polling
    #[serde(rename = "WEB")]
    Web,
}

impl ListenerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ListenerKind::Udp => "UDP",
            ListenerKind::Mqtt => "MQTT",
            ListenerKind::Web => "WEB",
        }
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ListenerKind {
    type Err = SondeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UDP" => Ok(ListenerKind::Udp),
            "MQTT" => Ok(ListenerKind::Mqtt),
            "WEB" | "HTTP" => Ok(ListenerKind::Web),
            _ => Err(SondeError::UnknownListener(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
}

impl ListenerLocation {
    pub fn coordinate(&self) -> Result<Coordinate> {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationThresholds {
    /// Alert when a sonde is within this many kilometres of home
    pub distance_km: f64,
    /// Alert when a sonde is below this altitude (metres)
    pub altitude_meters: f64,
    /// Minutes of silence before a landing alert; 0 disables landing alerts
    #[serde(default)]
    pub landing_point_timeout_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UdpBroadcast {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_udp_port")]
    pub listen_port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationService {
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notifications {
    #[serde(default)]
    pub services: Vec<NotificationService>,
}

impl Notifications {
    /// Enabled services with a non-empty URL
    pub fn active_urls(&self) -> Vec<String> {
        self.services
            .iter()
            .filter(|s| s.enabled && !s.url.trim().is_empty())
            .map(|s| s.url.trim().to_string())
            .collect()
    }
}

/// Application settings, loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub listener_location: ListenerLocation,
    pub notification_thresholds: NotificationThresholds,
    #[serde(default)]
    pub udp_broadcast: UdpBroadcast,
    pub listener_type: ListenerKind,
    #[serde(default)]
    pub notifications: Notifications,
}

pub const DEFAULT_UDP_PORT: u16 = 55673;

fn default_true() -> bool {
    true
}

fn default_udp_port() -> u16 {
    DEFAULT_UDP_PORT
}

impl Default for UdpBroadcast {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_port: DEFAULT_UDP_PORT,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listener_location: ListenerLocation {
                latitude: 0.0,
                longitude: 0.0,
                altitude: 0.0,
            },
            notification_thresholds: NotificationThresholds {
                distance_km: 20.0,
                altitude_meters: 1000.0,
                landing_point_timeout_minutes: 0,
            },
            udp_broadcast: UdpBroadcast::default(),
            listener_type: ListenerKind::Udp,
            notifications: Notifications {
                services: vec![NotificationService {
                    url: String::new(),
                    enabled: true,
                }],
            },
        }
    }
}

impl Settings {
    /// Load settings from the default location, creating the file with
    /// defaults on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load and validate settings from `path`. A missing file is created with
    /// default settings.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No settings file at {:?}, writing defaults", path);
            let settings = Settings::default();
            settings.save_to(path)?;
            return Ok(settings);
        }

        let data = fs::read_to_string(path).map_err(|e| {
            SondeError::config(format!("Failed to read settings file {:?}: {}", path, e))
        })?;

        let settings: Settings = serde_json::from_str(&data).map_err(|e| {
            SondeError::config(format!("Invalid settings file {:?}: {}", path, e))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SondeError::config("Could not determine config directory"))?;

        Ok(config_dir.join("sondewatch").join("config.json"))
    }

    /// Validated home position
    pub fn home(&self) -> Result<Coordinate> {
        self.listener_location.coordinate()
    }

    /// Reject settings the tracker cannot run with
    pub fn validate(&self) -> Result<()> {
        self.home().map_err(|e| SondeError::config(format!("listener_location: {}", e)))?;

        let thresholds = &self.notification_thresholds;
        if !thresholds.distance_km.is_finite() || thresholds.distance_km <= 0.0 {
            return Err(SondeError::config(format!(
                "notification_thresholds.distance_km must be positive, got {}",
                thresholds.distance_km
            )));
        }

        if !thresholds.altitude_meters.is_finite() {
            return Err(SondeError::config(
                "notification_thresholds.altitude_meters must be a finite number",
            ));
        }

        if self.listener_type == ListenerKind::Udp && !self.udp_broadcast.enabled {
            return Err(SondeError::config(
                "listener_type is UDP but udp_broadcast.enabled is false",
            ));
        }

        for service in self.notifications.services.iter().filter(|s| s.enabled) {
            let url = service.url.trim();
            if url.is_empty() {
                continue;
            }
            let parsed = url::Url::parse(url).map_err(|e| {
                SondeError::config(format!("Invalid notification URL '{}': {}", url, e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(SondeError::config(format!(
                    "Unsupported notification scheme '{}' in '{}' (only http and https webhooks)",
                    parsed.scheme(),
                    url
                )));
            }
        }

        Ok(())
    }
}
