//! Ellipsoidal distance on WGS-84.
//!
//! Solves the inverse geodesic problem with Karney's algorithm, which
//! converges for every pair of points, nearly antipodal ones included.

use geographiclib_rs::{Geodesic, InverseGeodesic};
use serde::Serialize;

use super::GeoPoint;

#[derive(Debug, Clone, Serialize)]
pub struct DistanceResult {
    pub distance_km: f64,
    pub source_coordinates: GeoPoint,
    pub destination_coordinates: GeoPoint,
}

/// Geodesic distance between two points in kilometers, unrounded.
pub fn geodesic_km(source: &GeoPoint, destination: &GeoPoint) -> f64 {
    let meters: f64 = Geodesic::wgs84().inverse(
        source.latitude(),
        source.longitude(),
        destination.latitude(),
        destination.longitude(),
    );
    meters / 1000.0
}

pub fn distance_between(source: GeoPoint, destination: GeoPoint) -> DistanceResult {
    DistanceResult {
        distance_km: geodesic_km(&source, &destination),
        source_coordinates: source,
        destination_coordinates: destination,
    }
}
