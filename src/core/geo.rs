//! Great-circle distance helpers.
//!
//! Distances use the haversine formula on a spherical Earth, which is accurate
//! to well under one percent at the ranges alerts are configured for.

use std::fmt;

use crate::error::{Result, SondeError};

/// Mean Earth radius in kilometres (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A validated WGS84 position.
///
/// Construction through [`Coordinate::new`] rejects NaN/infinite values and
/// values outside the valid latitude/longitude ranges, so every `Coordinate`
/// in the program is safe to feed into distance calculations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);

        if !valid {
            return Err(SondeError::InvalidCoordinate { lat, lon });
        }

        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Google Maps link centred on this position
    pub fn maps_url(&self) -> String {
        format!("https://www.google.com/maps?q={:.5},{:.5}", self.lat, self.lon)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lon)
    }
}

/// Great-circle distance between two positions, in kilometres.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Clamp guards against h drifting past 1.0 for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// True when `point` lies within `range_km` of `home` (inclusive).
pub fn is_within_range(home: Coordinate, point: Coordinate, range_km: f64) -> bool {
    distance_km(home, point) <= range_km
}
