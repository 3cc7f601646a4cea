//! Great-circle distance.

use std::f64::consts::PI;

use refnet_core::Coordinates;

/// Mean Earth radius used for all distance figures.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

fn to_radians(deg: f64) -> f64 {
    deg * PI / 180.0
}

/// Haversine distance between two points, in miles.
#[must_use]
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = to_radians(b.lat - a.lat);
    let d_lng = to_radians(b.lng - a.lng);
    let h = (d_lat / 2.0).sin().powi(2)
        + to_radians(a.lat).cos() * to_radians(b.lat).cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1.0 for antipodal points.
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_MILES * c
}
