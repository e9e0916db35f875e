use chrono::Duration;
use log::debug;

use crate::engine::geo::{destination_point, haversine_m, initial_bearing_deg, intermediate_point};
use crate::engine::mask::LandMask;
use crate::engine::models::{Edge, Maneuver, SearchState, WindSample};
use crate::engine::physics;
use crate::engine::polar::PolarTable;
use crate::engine::router::RouterConfig;
use crate::engine::wind::WindSource;
use crate::error::RouteError;

/// Slow-down factor applied to legs sailed below the configured minimum
/// boat speed: strong enough that the search avoids calms whenever an
/// alternative exists, finite so becalmed regions stay traversable.
pub const BECALMED_SLOWDOWN: f64 = 5.0;

/// Prices transitions between spatio-temporal states. Stateless aside
/// from read-only references to the wind field, polar table and land
/// mask.
pub struct CostModel<'a> {
    wind: &'a dyn WindSource,
    polar: &'a PolarTable,
    mask: &'a LandMask,
    config: &'a RouterConfig,
}

impl<'a> CostModel<'a> {
    pub fn new(
        wind: &'a dyn WindSource,
        polar: &'a PolarTable,
        mask: &'a LandMask,
        config: &'a RouterConfig,
    ) -> Self {
        Self {
            wind,
            polar,
            mask,
            config,
        }
    }

    /// Boat speed under the given wind on the given heading, floored at
    /// the configured minimum so calms still make way.
    pub fn effective_speed(&self, heading_deg: f64, wind: &WindSample) -> f64 {
        let twa = physics::true_wind_angle(heading_deg, wind.direction_deg);
        self.polar
            .speed(twa, wind.speed_ms)
            .max(self.config.min_boat_speed_ms)
    }

    /// State reached by holding `heading_deg` for one time step under
    /// `wind` (sampled by the caller at the start of the leg). The
    /// arrival time is provisional; the router re-times the state from
    /// the priced edge.
    pub fn project(&self, from: &SearchState, heading_deg: f64, wind: &WindSample) -> SearchState {
        let distance_m = self.effective_speed(heading_deg, wind) * self.config.time_step_s;
        SearchState {
            position: destination_point(from.position, heading_deg, distance_m),
            time: from.time + Duration::milliseconds((self.config.time_step_s * 1000.0) as i64),
            heading_deg: Some(heading_deg),
        }
    }

    /// Prices the transition `from -> to`. Returns `Ok(None)` when the
    /// leg crosses land (the transition does not exist); temporal wind
    /// errors propagate and abort the search. The returned cost is
    /// never negative.
    pub fn edge(&self, from: &SearchState, to: &SearchState) -> Result<Option<Edge>, RouteError> {
        if self.mask.segment_crosses_land(from.position, to.position) {
            return Ok(None);
        }

        let distance_m = haversine_m(from.position, to.position);
        let midpoint = intermediate_point(from.position, to.position, 0.5);
        let wind = self.wind.sample(midpoint, from.time)?;

        let course = initial_bearing_deg(from.position, to.position);
        let twa = physics::true_wind_angle(course, wind.direction_deg);
        let polar_speed = self.polar.speed(twa, wind.speed_ms);

        let (boat_speed, slowdown) = if polar_speed < self.config.min_boat_speed_ms {
            debug!(
                "becalmed leg at ({:.3}, {:.3}): polar speed {:.2} m/s below floor",
                midpoint.lat, midpoint.lon, polar_speed
            );
            (self.config.min_boat_speed_ms, BECALMED_SLOWDOWN)
        } else {
            (polar_speed, 1.0)
        };

        let duration_s = distance_m / boat_speed;

        let maneuver = physics::classify_maneuver(from.heading_deg, course, wind.direction_deg);
        let penalty_s = match maneuver {
            Maneuver::None => 0.0,
            Maneuver::Tack => self.config.tack_penalty_s,
            Maneuver::Jibe => self.config.jibe_penalty_s,
        };

        Ok(Some(Edge {
            cost_s: duration_s * slowdown + penalty_s,
            duration_s,
            distance_m,
            penalty_s,
            maneuver,
            boat_speed_ms: boat_speed,
            wind,
            twa_deg: twa,
        }))
    }
}
