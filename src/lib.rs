// Sondewatch Library - Public API

// Re-export error types
pub mod error;
pub use error::{Result, SondeError};

// Module declarations
pub mod commands;
pub mod core;
pub mod listeners;
pub mod notify;

// Re-export commonly used types
pub use core::config::{ListenerKind, Settings};
pub use core::telemetry::TelemetryRecord;
pub use core::tracker::{Alert, DeviceTracker, TrackerConfig};

// Initialize logging
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        // rumqttc and rustls are chatty at debug
        .filter_module("rumqttc", log::LevelFilter::Warn)
        .filter_module("rustls", log::LevelFilter::Warn)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}
