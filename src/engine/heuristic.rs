use serde::{Deserialize, Serialize};

use crate::engine::geo::{haversine_m, initial_bearing_deg, wrap_180, wrap_360};
use crate::engine::models::{Position, SearchState};
use crate::engine::physics;
use crate::engine::polar::PolarTable;
use crate::engine::wind::WindSource;

/// Estimate returned when the polar table cannot move the boat at all;
/// effectively "unreachable" without poisoning f-ordering with
/// infinities.
const UNREACHABLE_ESTIMATE_S: f64 = 1e9;

/// Reference-speed strategy for the lower bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeuristicMode {
    /// Best VMG-adjusted speed toward the goal under the
    /// most-recent-known wind at the goal vicinity. Tighter, but its
    /// admissibility is not formally guaranteed under strongly
    /// time-varying wind: wind en route may exceed wind at the goal.
    /// That approximation is deliberate and tested against the
    /// consistency assumption rather than silently "fixed".
    #[default]
    GoalWindVmg,
    /// Fastest speed anywhere in the polar table. Strictly admissible
    /// whenever the boat never outsails its polars.
    PolarMaximum,
}

/// Admissible remaining-time estimate: great-circle distance to the
/// goal divided by a speed the boat cannot better.
pub struct Heuristic<'a> {
    wind: &'a dyn WindSource,
    polar: &'a PolarTable,
    goal: Position,
    mode: HeuristicMode,
}

impl<'a> Heuristic<'a> {
    pub fn new(
        wind: &'a dyn WindSource,
        polar: &'a PolarTable,
        goal: Position,
        mode: HeuristicMode,
    ) -> Self {
        Self {
            wind,
            polar,
            goal,
            mode,
        }
    }

    /// Lower bound in seconds on the remaining time from `state` to the
    /// goal. Never negative; zero at the goal itself.
    pub fn estimate(&self, state: &SearchState) -> f64 {
        let distance_m = haversine_m(state.position, self.goal);
        if distance_m <= f64::EPSILON {
            return 0.0;
        }

        let reference = match self.mode {
            HeuristicMode::PolarMaximum => self.polar.max_speed(),
            HeuristicMode::GoalWindVmg => self.goal_wind_bound(state),
        };

        if reference <= 1e-9 {
            return UNREACHABLE_ESTIMATE_S;
        }
        distance_m / reference
    }

    /// Best achievable progress toward the goal under the wind at the
    /// goal vicinity: scans every polar TWA row on both tacks plus the
    /// direct course, projecting each onto the goal bearing. Falls back
    /// to the table maximum when the goal wind is unknown or yields no
    /// way forward.
    fn goal_wind_bound(&self, state: &SearchState) -> f64 {
        let Ok(wind) = self.wind.sample_clamped(self.goal, state.time) else {
            return self.polar.max_speed();
        };

        let bearing = initial_bearing_deg(state.position, self.goal);
        let direct_twa = physics::true_wind_angle(bearing, wind.direction_deg);
        let mut best = self.polar.speed(direct_twa, wind.speed_ms);

        for &twa in self.polar.twa_rows() {
            let speed = self.polar.speed(twa, wind.speed_ms);
            for sign in [-1.0, 1.0] {
                let heading = wrap_360(wind.direction_deg + sign * twa);
                let offset = wrap_180(heading - bearing).to_radians();
                best = best.max(speed * offset.cos());
            }
        }

        if best > 1e-9 {
            best
        } else {
            self.polar.max_speed()
        }
    }
}
