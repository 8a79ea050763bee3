// Core business logic module

pub mod config;
pub mod geo;
pub mod monitor;
pub mod telemetry;
pub mod tracker;

// Re-export commonly used items
pub use config::{ListenerKind, Settings};
pub use geo::{distance_km, is_within_range, Coordinate};
pub use monitor::Monitor;
pub use telemetry::TelemetryRecord;
pub use tracker::{Alert, AlertKind, DeviceState, DeviceTracker, SweepReport, TrackerConfig};
