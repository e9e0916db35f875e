//! Turns the search arena's parent chain into a reportable route.

use log::info;

use crate::engine::models::{Route, Waypoint};
use crate::engine::router::SearchNode;
use crate::error::RouteError;

/// Walks the parent indices back from `goal_index`, reverses the chain
/// and emits the ordered route with per-leg distance and duration.
/// An empty chain signals [`RouteError::EmptyPath`]; given the search
/// contract that is unreachable and indicates an internal invariant
/// violation.
pub(crate) fn build(arena: &[SearchNode], goal_index: usize) -> Result<Route, RouteError> {
    if arena.is_empty() {
        return Err(RouteError::EmptyPath);
    }

    let mut chain = Vec::new();
    let mut cursor = Some(goal_index);
    while let Some(index) = cursor {
        chain.push(index);
        cursor = arena[index].parent;
    }
    chain.reverse();

    let mut waypoints = Vec::with_capacity(chain.len());
    let mut total_distance_m = 0.0;
    let mut total_duration_s = 0.0;

    for &index in &chain {
        let node = &arena[index];
        let (leg_distance_m, leg_duration_s, maneuver, boat_speed_ms, wind, twa_deg) =
            match &node.edge {
                Some(edge) => (
                    edge.distance_m,
                    edge.duration_s,
                    edge.maneuver,
                    edge.boat_speed_ms,
                    Some(edge.wind),
                    Some(edge.twa_deg),
                ),
                None => (0.0, 0.0, Default::default(), 0.0, None, None),
            };

        total_distance_m += leg_distance_m;
        total_duration_s += leg_duration_s;
        waypoints.push(Waypoint {
            position: node.state.position,
            time: node.state.time,
            heading: node.state.heading_deg,
            leg_distance_m,
            leg_duration_s,
            maneuver,
            boat_speed_ms,
            wind,
            twa_deg,
        });
    }

    info!(
        "route built: {} waypoints, {:.1} nm, {:.1} h",
        waypoints.len(),
        total_distance_m / 1852.0,
        total_duration_s / 3600.0,
    );

    Ok(Route {
        waypoints,
        total_distance_m,
        total_duration_s,
    })
}
