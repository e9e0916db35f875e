//! A* search over the spatio-temporal state lattice.
//!
//! States are identified by their discretization cell (lattice position
//! plus time bucket). A state is closed on first pop; a later arrival in
//! the same cell with a lower accumulated cost is not reopened. That is
//! correct for a consistent heuristic; under strongly time-varying wind
//! the goal-wind bound is not formally consistent, a known approximation
//! this engine accepts rather than paying for reopening.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::cost::CostModel;
use crate::engine::geo::{haversine_m, initial_bearing_deg, wrap_360};
use crate::engine::heuristic::{Heuristic, HeuristicMode};
use crate::engine::mask::LandMask;
use crate::engine::models::{Edge, Position, Route, SearchState, WindSample};
use crate::engine::polar::PolarTable;
use crate::engine::waypoints;
use crate::engine::wind::WindSource;
use crate::error::{CancelReason, RouteError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Duration of one expansion leg in seconds.
    pub time_step_s: f64,
    /// Number of evenly spaced candidate compass bearings per expansion.
    /// The direct bearing to the goal and the four VMG headings are
    /// always added on top.
    pub heading_count: usize,
    /// Arrival tolerance around the destination in meters.
    pub goal_radius_m: f64,
    /// Candidates arriving later than this after departure are pruned;
    /// draining the open set against this bound guarantees termination.
    pub max_search_horizon_s: f64,
    /// Polar speeds below this floor mark the leg as becalmed.
    pub min_boat_speed_ms: f64,
    /// Added to a leg's cost when it crosses head-to-wind.
    pub tack_penalty_s: f64,
    /// Added to a leg's cost when it crosses dead-downwind.
    pub jibe_penalty_s: f64,
    /// Latitude extent of one state-identity cell in degrees.
    pub lattice_lat_deg: f64,
    /// Longitude extent of one state-identity cell in degrees.
    pub lattice_lon_deg: f64,
    /// Hard cap on popped states per search invocation.
    pub max_iterations: u64,
    /// Optional wall-clock budget per search invocation, checked
    /// cooperatively inside the expansion loop.
    pub deadline: Option<std::time::Duration>,
    /// Reference-speed strategy of the lower-bound estimate.
    pub heuristic_mode: HeuristicMode,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            time_step_s: 3600.0,
            heading_count: 36,
            goal_radius_m: 8_000.0,
            max_search_horizon_s: 864_000.0,
            min_boat_speed_ms: 0.25,
            tack_penalty_s: 180.0,
            jibe_penalty_s: 120.0,
            lattice_lat_deg: 0.05,
            lattice_lon_deg: 0.05,
            max_iterations: 50_000,
            deadline: None,
            heuristic_mode: HeuristicMode::default(),
        }
    }
}

impl RouterConfig {
    pub fn validate(&self) -> Result<(), RouteError> {
        if !(self.time_step_s > 0.0) {
            return Err(RouteError::InvalidConfiguration(
                "time_step_s must be positive".into(),
            ));
        }
        if self.heading_count == 0 {
            return Err(RouteError::InvalidConfiguration(
                "heading_count must be at least 1".into(),
            ));
        }
        if !(self.goal_radius_m > 0.0) {
            return Err(RouteError::InvalidConfiguration(
                "goal_radius_m must be positive".into(),
            ));
        }
        if !(self.max_search_horizon_s > 0.0) {
            return Err(RouteError::InvalidConfiguration(
                "max_search_horizon_s must be positive".into(),
            ));
        }
        // the floor also guarantees every projected leg makes way, so a
        // zero floor would let the search spin in place
        if !(self.min_boat_speed_ms > 0.0) {
            return Err(RouteError::InvalidConfiguration(
                "min_boat_speed_ms must be positive".into(),
            ));
        }
        if self.tack_penalty_s < 0.0 || self.jibe_penalty_s < 0.0 {
            return Err(RouteError::InvalidConfiguration(
                "maneuver penalties must be non-negative".into(),
            ));
        }
        if !(self.lattice_lat_deg > 0.0) || !(self.lattice_lon_deg > 0.0) {
            return Err(RouteError::InvalidConfiguration(
                "lattice cell sizes must be positive".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(RouteError::InvalidConfiguration(
                "max_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// One independent routing request for [`RouteSearch::route_batch`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start: Position,
    pub goal: Position,
    pub departure: DateTime<Utc>,
}

/// Discretization cell identifying a search state: lattice row/column
/// plus time bucket since departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellKey {
    i: i64,
    j: i64,
    k: i64,
}

/// Total order over f64 keys so NaN cannot poison the heap.
#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Open-set entry. Popped in ascending `f`; ties broken by smaller `h`
/// (closer to the goal), then by insertion order so expansion is FIFO
/// and fully deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    f: FloatOrd,
    h: FloatOrd,
    seq: u64,
    index: usize,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f
            .cmp(&other.f)
            .then_with(|| self.h.cmp(&other.h))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Arena slot. Parents are arena indices, so path reconstruction never
/// chases owned pointers.
pub(crate) struct SearchNode {
    pub(crate) state: SearchState,
    pub(crate) g_cost: f64,
    pub(crate) parent: Option<usize>,
    /// Priced transition from the parent; `None` only at the start.
    pub(crate) edge: Option<Edge>,
}

/// The search engine. Holds read-only references to the long-lived
/// collaborators; every invocation owns its open/closed sets
/// exclusively, so independent searches run concurrently without locks.
pub struct RouteSearch<'a> {
    wind: &'a dyn WindSource,
    polar: &'a PolarTable,
    mask: &'a LandMask,
    config: RouterConfig,
}

impl<'a> RouteSearch<'a> {
    pub fn new(
        wind: &'a dyn WindSource,
        polar: &'a PolarTable,
        mask: &'a LandMask,
        config: RouterConfig,
    ) -> Result<Self, RouteError> {
        config.validate()?;
        info!(
            "router ready: dt={}s, {} headings, goal radius {} m, horizon {} s",
            config.time_step_s,
            config.heading_count,
            config.goal_radius_m,
            config.max_search_horizon_s,
        );
        Ok(Self {
            wind,
            polar,
            mask,
            config,
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Computes a route from `start` to `goal` departing at `departure`.
    /// On success the route ends exactly on the goal position; every
    /// failure mode surfaces as a distinct [`RouteError`] and yields no
    /// partial route.
    pub fn route(
        &self,
        start: Position,
        goal: Position,
        departure: DateTime<Utc>,
    ) -> Result<Route, RouteError> {
        start.validate()?;
        goal.validate()?;

        let direct_m = haversine_m(start, goal);
        if self.mask.is_land(start) || self.mask.is_land(goal) {
            info!("start or goal on land, no route");
            return Err(RouteError::NoRouteFound {
                iterations: 0,
                closest_distance_m: direct_m,
            });
        }
        // departure must lie inside wind coverage; later samples fail
        // the same way if the search outruns the forecast
        self.wind.sample(start, departure)?;

        info!(
            "route: ({:.2}, {:.2}) -> ({:.2}, {:.2}), {:.1} nm direct",
            start.lat,
            start.lon,
            goal.lat,
            goal.lon,
            direct_m / 1852.0,
        );

        let cost = CostModel::new(self.wind, self.polar, self.mask, &self.config);
        let heuristic = Heuristic::new(self.wind, self.polar, goal, self.config.heuristic_mode);
        let started = Instant::now();

        let start_state = SearchState {
            position: start,
            time: departure,
            heading_deg: None,
        };
        let mut arena = vec![SearchNode {
            state: start_state,
            g_cost: 0.0,
            parent: None,
            edge: None,
        }];

        let mut open: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
        let h0 = heuristic.estimate(&start_state);
        open.push(Reverse(OpenNode {
            f: FloatOrd(h0),
            h: FloatOrd(h0),
            seq: 0,
            index: 0,
        }));
        let mut seq = 1u64;

        let mut closed: HashSet<CellKey> = HashSet::new();
        let mut best_g: HashMap<CellKey, f64> = HashMap::new();
        best_g.insert(self.cell_key(&start_state, departure), 0.0);

        let mut iterations = 0u64;
        let mut closest_m = direct_m;

        while let Some(Reverse(node)) = open.pop() {
            iterations += 1;
            if iterations > self.config.max_iterations {
                return Err(RouteError::SearchCancelled {
                    reason: CancelReason::IterationCap,
                    iterations,
                });
            }
            if let Some(budget) = self.config.deadline {
                if started.elapsed() >= budget {
                    return Err(RouteError::SearchCancelled {
                        reason: CancelReason::Deadline,
                        iterations,
                    });
                }
            }

            let (state, g) = {
                let n = &arena[node.index];
                (n.state, n.g_cost)
            };
            if !closed.insert(self.cell_key(&state, departure)) {
                continue;
            }

            let dist_m = haversine_m(state.position, goal);
            closest_m = closest_m.min(dist_m);
            if dist_m <= self.config.goal_radius_m {
                info!(
                    "goal reached after {iterations} iterations, g = {:.0} s",
                    g
                );
                return waypoints::build(&arena, node.index);
            }
            if iterations % 100 == 0 {
                debug!(
                    "iter {iterations}: dist={:.1} nm, g={:.1} h, open={}",
                    dist_m / 1852.0,
                    g / 3600.0,
                    open.len(),
                );
            }

            let wind_here = self.wind.sample(state.position, state.time)?;
            let goal_bearing = initial_bearing_deg(state.position, goal);

            for heading in self.candidate_headings(goal_bearing, &wind_here) {
                let mut to = cost.project(&state, heading, &wind_here);

                // terminal leg: within the arrival radius, or overshot
                // the goal on the direct course. Pin the candidate to
                // the goal so the edge is re-priced pro-rata for the
                // partial leg.
                let leg_m = haversine_m(state.position, to.position);
                let endpoint_near = haversine_m(to.position, goal) <= self.config.goal_radius_m;
                let overshoots = heading == goal_bearing && dist_m <= leg_m;
                if endpoint_near || overshoots {
                    to.position = goal;
                    to.heading_deg = Some(goal_bearing);
                }

                let Some(edge) = cost.edge(&state, &to)? else {
                    continue;
                };
                to.time = state.time + Duration::milliseconds((edge.duration_s * 1000.0) as i64);

                let elapsed_s = (to.time - departure).num_milliseconds() as f64 / 1000.0;
                if elapsed_s > self.config.max_search_horizon_s {
                    continue;
                }

                let key = self.cell_key(&to, departure);
                if closed.contains(&key) {
                    continue;
                }
                let g_new = g + edge.cost_s;
                if best_g.get(&key).is_some_and(|&known| known <= g_new) {
                    continue;
                }
                best_g.insert(key, g_new);

                let h = heuristic.estimate(&to);
                arena.push(SearchNode {
                    state: to,
                    g_cost: g_new,
                    parent: Some(node.index),
                    edge: Some(edge),
                });
                open.push(Reverse(OpenNode {
                    f: FloatOrd(g_new + h),
                    h: FloatOrd(h),
                    seq,
                    index: arena.len() - 1,
                }));
                seq += 1;
            }
        }

        info!(
            "open set exhausted after {iterations} iterations, closest approach {:.1} nm",
            closest_m / 1852.0,
        );
        Err(RouteError::NoRouteFound {
            iterations,
            closest_distance_m: closest_m,
        })
    }

    /// Runs independent searches in parallel over the shared read-only
    /// collaborators. Result order matches request order.
    pub fn route_batch(&self, requests: &[RouteRequest]) -> Vec<Result<Route, RouteError>> {
        requests
            .par_iter()
            .map(|r| self.route(r.start, r.goal, r.departure))
            .collect()
    }

    fn cell_key(&self, state: &SearchState, departure: DateTime<Utc>) -> CellKey {
        let elapsed_s = (state.time - departure).num_milliseconds() as f64 / 1000.0;
        CellKey {
            i: (state.position.lat / self.config.lattice_lat_deg).floor() as i64,
            j: (state.position.lon / self.config.lattice_lon_deg).floor() as i64,
            k: (elapsed_s / self.config.time_step_s).floor() as i64,
        }
    }

    /// Candidate bearings for one expansion: the direct-to-goal course,
    /// `heading_count` evenly spaced compass bearings, and the four VMG
    /// headings either side of the wind. Deduplicated on a 0.1-degree
    /// grid, goal course kept first so it survives the dedup exactly.
    fn candidate_headings(&self, goal_bearing: f64, wind: &WindSample) -> Vec<f64> {
        let n = self.config.heading_count;
        let mut headings = Vec::with_capacity(n + 5);
        headings.push(goal_bearing);
        for i in 0..n {
            headings.push(i as f64 * 360.0 / n as f64);
        }
        let twa_up = self.polar.best_vmg_angle(wind.speed_ms);
        let twa_down = self.polar.best_downwind_vmg_angle(wind.speed_ms);
        for sign in [-1.0, 1.0] {
            headings.push(wrap_360(wind.direction_deg + sign * twa_up));
            headings.push(wrap_360(wind.direction_deg + sign * twa_down));
        }

        let mut seen = HashSet::with_capacity(headings.len());
        headings.retain(|h| seen.insert(((wrap_360(*h) * 10.0).round() as i32) % 3600));
        headings
    }
}
