//! Geocoding and geodesic distance tools.

pub mod distance;
pub mod geocoder;
pub mod server;

use serde::{Serialize, Serializer};

use crate::error::{Result, ToolError};

pub use distance::{distance_between, DistanceResult};
pub use geocoder::{GeocodeResult, Geocoder};
pub use server::GeoServer;

/// A validated WGS-84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ToolError::InvalidArgument(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ToolError::InvalidArgument(format!(
                "longitude {longitude} is outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Serialized as a `[latitude, longitude]` pair.
impl Serialize for GeoPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        (self.latitude, self.longitude).serialize(serializer)
    }
}
