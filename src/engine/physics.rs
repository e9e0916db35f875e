//! Wind/heading conventions shared by the cost model and the router.
//!
//! Heading: 0° = North, clockwise. Wind direction: meteorological,
//! "where the wind comes from". TWA: angle between heading and wind,
//! folded into [0, 180] (polars are symmetric port/starboard).

use crate::engine::geo::wrap_180;
use crate::engine::models::Maneuver;

/// True Wind Angle between a heading and a wind-from direction, in
/// [0, 180].
pub fn true_wind_angle(heading_deg: f64, wind_from_deg: f64) -> f64 {
    wrap_180(wind_from_deg - heading_deg).abs()
}

/// Which side the wind comes over: +1 starboard, -1 port, 0 dead
/// head-to-wind.
pub fn tack_sign(heading_deg: f64, wind_from_deg: f64) -> i8 {
    let delta = wrap_180(wind_from_deg - heading_deg);
    if delta.abs() < 1e-6 {
        0
    } else if delta > 0.0 {
        1
    } else {
        -1
    }
}

/// Detects a tack or a jibe from the tack-sign change between two legs.
/// A sign flip while the (mean) TWA is below 90° crossed head-to-wind;
/// at or above 90° it crossed dead-downwind. Legs sailed dead up- or
/// downwind (sign 0) never register a maneuver.
pub fn classify_maneuver(
    prev_heading_deg: Option<f64>,
    new_heading_deg: f64,
    wind_from_deg: f64,
) -> Maneuver {
    let Some(prev_heading) = prev_heading_deg else {
        return Maneuver::None;
    };

    let prev_tack = tack_sign(prev_heading, wind_from_deg);
    let new_tack = tack_sign(new_heading_deg, wind_from_deg);
    if prev_tack == 0 || new_tack == 0 || prev_tack == new_tack {
        return Maneuver::None;
    }

    let prev_twa = true_wind_angle(prev_heading, wind_from_deg);
    let new_twa = true_wind_angle(new_heading_deg, wind_from_deg);
    if 0.5 * (prev_twa + new_twa) < 90.0 {
        Maneuver::Tack
    } else {
        Maneuver::Jibe
    }
}
