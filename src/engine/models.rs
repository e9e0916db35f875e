use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::geo;
use crate::error::RouteError;

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Checks the [-90, 90] × [-180, 180] validity ranges.
    pub fn validate(&self) -> Result<(), RouteError> {
        if !self.lat.is_finite() || self.lat < -90.0 || self.lat > 90.0 {
            return Err(RouteError::InvalidConfiguration(format!(
                "latitude {} outside [-90, 90]",
                self.lat
            )));
        }
        if !self.lon.is_finite() || self.lon < -180.0 || self.lon > 180.0 {
            return Err(RouteError::InvalidConfiguration(format!(
                "longitude {} outside [-180, 180]",
                self.lon
            )));
        }
        Ok(())
    }
}

/// Wind at a point, meteorological convention: `direction_deg` is the
/// direction the wind blows FROM, 0° = North, in [0, 360).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSample {
    pub speed_ms: f64,
    pub direction_deg: f64,
}

impl WindSample {
    pub fn new(speed_ms: f64, direction_deg: f64) -> Self {
        Self {
            speed_ms,
            direction_deg: geo::wrap_360(direction_deg),
        }
    }

    /// Builds a sample from geographic U/V components (U > 0 eastward,
    /// V > 0 northward, m/s).
    pub fn from_components(u_ms: f64, v_ms: f64) -> Self {
        let speed = u_ms.hypot(v_ms);
        let direction = geo::wrap_360(270.0 - v_ms.atan2(u_ms).to_degrees());
        Self {
            speed_ms: speed,
            direction_deg: direction,
        }
    }

    /// Inverse of [`from_components`](Self::from_components).
    pub fn components(&self) -> (f64, f64) {
        let theta = self.direction_deg.to_radians();
        (-self.speed_ms * theta.sin(), -self.speed_ms * theta.cos())
    }
}

/// A node of the spatio-temporal search space. Identity during a search
/// is the discretization cell (lattice position + time bucket), handled
/// by the router, not by this type's `PartialEq`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchState {
    pub position: Position,
    pub time: DateTime<Utc>,
    /// Heading sailed to reach this state; `None` at the start state.
    pub heading_deg: Option<f64>,
}

/// Maneuver classification of a transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Maneuver {
    #[default]
    None,
    Tack,
    Jibe,
}

/// Priced transition between two search states. Transient: built and
/// discarded per expansion step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Composite cost in seconds: sailing time, becalmed slow-down and
    /// maneuver penalty included. Never negative.
    pub cost_s: f64,
    /// Pure sailing time of the leg in seconds.
    pub duration_s: f64,
    pub distance_m: f64,
    /// Maneuver penalty component of `cost_s`.
    pub penalty_s: f64,
    pub maneuver: Maneuver,
    pub boat_speed_ms: f64,
    pub wind: WindSample,
    pub twa_deg: f64,
}

/// One reportable point of a finished route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Position,
    pub time: DateTime<Utc>,
    pub heading: Option<f64>,
    pub leg_distance_m: f64,
    pub leg_duration_s: f64,
    pub maneuver: Maneuver,
    pub boat_speed_ms: f64,
    pub wind: Option<WindSample>,
    pub twa_deg: Option<f64>,
}

/// Ordered waypoint sequence produced by a successful search. Immutable
/// once built; owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub waypoints: Vec<Waypoint>,
    pub total_distance_m: f64,
    pub total_duration_s: f64,
}

impl Route {
    pub fn distance_nm(&self) -> f64 {
        self.total_distance_m / 1852.0
    }

    pub fn duration_hours(&self) -> f64 {
        self.total_duration_s / 3600.0
    }

    pub fn eta(&self) -> Option<DateTime<Utc>> {
        self.waypoints.last().map(|wp| wp.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wind_direction_conventions() {
        // Meteorological: 0 = wind from North, 90 = from East.
        // GRIB components: u > 0 eastward, v > 0 northward.
        // From North: u=0, v=-5 => atan2(-5,0) = -90, dir = 270-(-90) = 0.
        let north = WindSample::from_components(0.0, -5.0);
        assert_eq!(north.direction_deg, 0.0);
        assert_eq!(north.speed_ms, 5.0);

        let east = WindSample::from_components(-5.0, 0.0);
        assert_eq!(east.direction_deg, 90.0);

        let south = WindSample::from_components(0.0, 5.0);
        assert_eq!(south.direction_deg, 180.0);

        let west = WindSample::from_components(5.0, 0.0);
        assert_eq!(west.direction_deg, 270.0);
    }

    #[test]
    fn test_wind_components_roundtrip() {
        let sample = WindSample::new(8.2, 215.0);
        let (u, v) = sample.components();
        let back = WindSample::from_components(u, v);
        assert!((back.speed_ms - sample.speed_ms).abs() < 1e-9);
        assert!((back.direction_deg - sample.direction_deg).abs() < 1e-9);
    }

    #[test]
    fn test_position_validation() {
        assert!(Position::new(48.66, -2.03).validate().is_ok());
        assert!(Position::new(91.0, 0.0).validate().is_err());
        assert!(Position::new(0.0, 181.0).validate().is_err());
        assert!(Position::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_route_accessors() {
        let route = Route {
            waypoints: vec![],
            total_distance_m: 1852.0,
            total_duration_s: 7200.0,
        };
        assert!((route.distance_nm() - 1.0).abs() < 1e-12);
        assert!((route.duration_hours() - 2.0).abs() < 1e-12);
        assert!(route.eta().is_none());
    }
}
