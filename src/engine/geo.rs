//! Great-circle geometry on a spherical Earth. All angles in degrees,
//! all distances in meters.

use crate::engine::models::Position;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters spanned by one degree of latitude (and of longitude at the
/// equator).
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// Normalizes an angle to [0, 360).
pub fn wrap_360(angle_deg: f64) -> f64 {
    let a = angle_deg % 360.0;
    if a < 0.0 { a + 360.0 } else { a }
}

/// Normalizes an angle to [-180, 180).
pub fn wrap_180(angle_deg: f64) -> f64 {
    (angle_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Great-circle (haversine) distance between two positions in meters.
pub fn haversine_m(from: Position, to: Position) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let d_phi = (to.lat - from.lat).to_radians();
    let d_lambda = (to.lon - from.lon).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial bearing from one position to another, 0° = North, clockwise,
/// in [0, 360).
pub fn initial_bearing_deg(from: Position, to: Position) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let d_lambda = (to.lon - from.lon).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    wrap_360(y.atan2(x).to_degrees())
}

/// Position reached after sailing `distance_m` on a constant initial
/// bearing.
pub fn destination_point(start: Position, bearing_deg: f64, distance_m: f64) -> Position {
    let d = distance_m / EARTH_RADIUS_M;
    let brng = bearing_deg.to_radians();

    let lat1 = start.lat.to_radians();
    let lon1 = start.lon.to_radians();

    let lat2 = (lat1.sin() * d.cos() + lat1.cos() * d.sin() * brng.cos()).asin();
    let lon2 = lon1
        + (brng.sin() * d.sin() * lat1.cos()).atan2(d.cos() - lat1.sin() * lat2.sin());

    Position::new(lat2.to_degrees(), wrap_180(lon2.to_degrees()))
}

/// Point at `fraction` (0..=1) along the great circle from `from` to
/// `to`. Degenerate segments return the start point.
pub fn intermediate_point(from: Position, to: Position, fraction: f64) -> Position {
    let delta = haversine_m(from, to) / EARTH_RADIUS_M;
    if delta < 1e-12 {
        return from;
    }

    let a = ((1.0 - fraction) * delta).sin() / delta.sin();
    let b = (fraction * delta).sin() / delta.sin();

    let phi1 = from.lat.to_radians();
    let lambda1 = from.lon.to_radians();
    let phi2 = to.lat.to_radians();
    let lambda2 = to.lon.to_radians();

    let x = a * phi1.cos() * lambda1.cos() + b * phi2.cos() * lambda2.cos();
    let y = a * phi1.cos() * lambda1.sin() + b * phi2.cos() * lambda2.sin();
    let z = a * phi1.sin() + b * phi2.sin();

    let lat = z.atan2((x * x + y * y).sqrt());
    let lon = y.atan2(x);
    Position::new(lat.to_degrees(), wrap_180(lon.to_degrees()))
}
