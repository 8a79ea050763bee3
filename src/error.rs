use std::io;
use thiserror::Error;

/// Custom error type for the sondewatch library
#[derive(Error, Debug)]
pub enum SondeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid coordinate: latitude {lat}, longitude {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("Unknown listener type '{0}' (expected one of: UDP, MQTT, WEB)")]
    UnknownListener(String),

    #[error("Malformed telemetry: {0}")]
    Normalize(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for the sondewatch library
pub type Result<T> = std::result::Result<T, SondeError>;

impl SondeError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        SondeError::Config(msg.into())
    }

    /// Create a normalization error for a payload that cannot become a record
    pub fn normalize<S: Into<String>>(msg: S) -> Self {
        SondeError::Normalize(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SondeError::Other(msg.into())
    }
}
