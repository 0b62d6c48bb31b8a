//! Distance helpers for trajectory sampling and route legs.

use std::f64::consts::{FRAC_PI_4, PI};

use crate::models::Position;

/// Mean earth radius in metres
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Metres per nautical mile
pub const METERS_PER_NM: f64 = 1852.0;

/// Flat-earth distance in metres, good enough for short spacing checks.
pub fn planar_distance_m(a: &Position, b: &Position) -> f64 {
    let mean_lat = ((a.lat + b.lat) / 2.0).to_radians();
    let dx = normalize_lon((b.lon - a.lon).to_radians()) * mean_lat.cos();
    let dy = (b.lat - a.lat).to_radians();
    (dx * dx + dy * dy).sqrt() * EARTH_RADIUS_M
}

/// Distance along a constant-bearing track, in metres.
pub fn rhumb_line_distance_m(a: &Position, b: &Position) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = phi2 - phi1;
    let d_lambda = normalize_lon((b.lon - a.lon).to_radians());

    let d_psi = ((FRAC_PI_4 + phi2 / 2.0).tan() / (FRAC_PI_4 + phi1 / 2.0).tan()).ln();
    // East-west tracks have a degenerate stretched latitude difference
    let q = if d_psi.abs() > 1e-12 {
        d_phi / d_psi
    } else {
        phi1.cos()
    };

    (d_phi * d_phi + q * q * d_lambda * d_lambda).sqrt() * EARTH_RADIUS_M
}

/// Rhumb-line distance in nautical miles.
pub fn rhumb_line_distance_nm(a: &Position, b: &Position) -> f64 {
    rhumb_line_distance_m(a, b) / METERS_PER_NM
}

fn normalize_lon(d_lambda: f64) -> f64 {
    if d_lambda > PI {
        d_lambda - 2.0 * PI
    } else if d_lambda < -PI {
        d_lambda + 2.0 * PI
    } else {
        d_lambda
    }
}
