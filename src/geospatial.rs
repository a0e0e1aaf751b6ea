use geo::{Distance, Euclidean, Point};
use serde::{Deserialize, Serialize};

use crate::error::RouteError;

/// Earth radius used for great-circle distances, in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 position in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Interop with the geo crate; x is longitude, y is latitude.
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }
}

/// Great-circle distance between two coordinates in kilometers.
///
/// Symmetric, and zero for identical points.
pub fn haversine_distance(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

    EARTH_RADIUS_KM * 2.0 * h.sqrt().asin()
}

/// Straight-line distance in raw degree space.
///
/// This is the A* heuristic, kept as-is: it underestimates real road cost by
/// roughly two orders of magnitude and its tie-break behavior downstream
/// depends on exactly this definition. Not interchangeable with
/// [`haversine_distance`].
pub fn euclidean_degrees(a: Coordinates, b: Coordinates) -> f64 {
    Euclidean.distance(a.to_point(), b.to_point())
}

/// Rejects non-finite or out-of-range coordinates.
///
/// Must run before any network lookup or search; validation failures are
/// deterministic and never retried.
pub fn validate_coordinates(c: Coordinates) -> Result<(), RouteError> {
    if !c.lat.is_finite() || !c.lng.is_finite() {
        return Err(RouteError::InvalidCoordinates(format!(
            "coordinates must be numeric, got lat={}, lng={}",
            c.lat, c.lng
        )));
    }
    if !(-90.0..=90.0).contains(&c.lat) {
        return Err(RouteError::InvalidCoordinates(format!(
            "latitude {} out of range [-90, 90]",
            c.lat
        )));
    }
    if !(-180.0..=180.0).contains(&c.lng) {
        return Err(RouteError::InvalidCoordinates(format!(
            "longitude {} out of range [-180, 180]",
            c.lng
        )));
    }
    Ok(())
}
