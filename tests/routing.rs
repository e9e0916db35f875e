//! End-to-end routing scenarios on synthetic fields.

use chrono::{DateTime, TimeZone, Utc};

use windroute::engine::geo::haversine_m;
use windroute::{
    CancelReason, Heuristic, HeuristicMode, LandMask, Maneuver, OutsideBounds, PolarTable,
    Position, RouteError, RouteRequest, RouteSearch, RouterConfig, SearchState, WindGrid,
    WindSample,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn departure() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 8, 0, 0, 0).unwrap()
}

/// Constant wind everywhere, valid for 30 days from departure.
fn steady_wind(speed_ms: f64, from_deg: f64) -> WindGrid {
    WindGrid::constant(
        WindSample::new(speed_ms, from_deg),
        departure(),
        departure() + chrono::Duration::days(30),
    )
    .unwrap()
}

/// Symmetric polar: 6 m/s on a beam reach, dead zone at 0 and 20 TWA.
fn beating_polar() -> PolarTable {
    PolarTable::new(
        vec![0.0, 20.0, 45.0, 90.0, 135.0, 180.0],
        vec![0.0, 5.0, 10.0, 20.0],
        vec![
            vec![0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0],
            vec![0.0, 2.0, 4.0, 4.5],
            vec![0.0, 3.0, 6.0, 6.5],
            vec![0.0, 2.5, 5.0, 5.5],
            vec![0.0, 1.5, 3.0, 3.5],
        ],
    )
    .unwrap()
}

fn open_sea() -> LandMask {
    LandMask::all_sea(-5.0, 5.0, -5.0, 5.0, 0.1).unwrap()
}

fn config() -> RouterConfig {
    RouterConfig {
        time_step_s: 1800.0,
        goal_radius_m: 8_000.0,
        ..RouterConfig::default()
    }
}

#[test]
fn beam_reach_is_near_straight() {
    init_logs();
    let wind = steady_wind(10.0, 0.0);
    let polar = beating_polar();
    let mask = open_sea();
    let search = RouteSearch::new(&wind, &polar, &mask, config()).unwrap();

    // one degree due east under a northerly: a clean beam reach
    let start = Position::new(0.0, 0.0);
    let goal = Position::new(0.0, 1.0);
    let route = search.route(start, goal, departure()).unwrap();

    let expected_s = haversine_m(start, goal) / 6.0;
    assert!(
        (route.total_duration_s - expected_s).abs() < 1000.0,
        "duration {:.0} s, expected about {:.0} s",
        route.total_duration_s,
        expected_s,
    );
    // no reason to maneuver with the goal abeam
    assert!(route.waypoints.iter().all(|wp| wp.maneuver == Maneuver::None));
    // the path never strays far off the direct parallel
    assert!(route.waypoints.iter().all(|wp| wp.position.lat.abs() < 0.2));
    // ends exactly on the goal
    let last = route.waypoints.last().unwrap();
    assert!(haversine_m(last.position, goal) < 1.0);
}

#[test]
fn heuristic_underestimates_realized_route() {
    init_logs();
    let wind = steady_wind(10.0, 0.0);
    let polar = beating_polar();
    let mask = open_sea();
    let search = RouteSearch::new(&wind, &polar, &mask, config()).unwrap();

    let start = Position::new(0.0, 0.0);
    for goal in [Position::new(0.0, 1.0), Position::new(0.8, 0.3)] {
        let route = search.route(start, goal, departure()).unwrap();
        let state = SearchState {
            position: start,
            time: departure(),
            heading_deg: None,
        };
        for mode in [HeuristicMode::GoalWindVmg, HeuristicMode::PolarMaximum] {
            let h = Heuristic::new(&wind, &polar, goal, mode);
            assert!(
                h.estimate(&state) <= route.total_duration_s + 1.0,
                "{mode:?} overestimates",
            );
        }
    }
}

#[test]
fn upwind_goal_forces_tacking() {
    init_logs();
    let wind = steady_wind(10.0, 0.0);
    let polar = beating_polar();
    let mask = open_sea();
    let cfg = RouterConfig {
        goal_radius_m: 5_000.0,
        ..config()
    };
    let search = RouteSearch::new(&wind, &polar, &mask, cfg).unwrap();

    // goal dead upwind of the start
    let start = Position::new(0.0, 0.0);
    let goal = Position::new(0.5, 0.0);
    let route = search.route(start, goal, departure()).unwrap();

    let tacks = route
        .waypoints
        .iter()
        .filter(|wp| wp.maneuver == Maneuver::Tack)
        .count();
    assert!(tacks >= 1, "expected at least one tack, got none");

    // beating is strictly slower than the impossible straight line
    let direct_best_s = haversine_m(start, goal) / polar.max_speed();
    assert!(route.total_duration_s > direct_best_s);
}

#[test]
fn solid_barrier_reports_no_route() {
    init_logs();
    let wind = steady_wind(10.0, 0.0);
    let polar = beating_polar();
    // closed basin: everything outside the raster counts as land, and a
    // wall spans its full width between start and goal
    let mut mask = LandMask::all_sea(-1.0, 1.0, -0.5, 0.5, 0.05)
        .unwrap()
        .with_outside_policy(OutsideBounds::Land);
    mask.add_land_box(0.2, 0.35, -0.5, 0.5);
    let cfg = RouterConfig {
        max_search_horizon_s: 21_600.0,
        // draining the basin takes more pops than a routable search
        max_iterations: 200_000,
        ..config()
    };
    let search = RouteSearch::new(&wind, &polar, &mask, cfg).unwrap();

    let err = search
        .route(Position::new(-0.5, 0.0), Position::new(0.7, 0.0), departure())
        .unwrap_err();
    match err {
        RouteError::NoRouteFound {
            iterations,
            closest_distance_m,
        } => {
            assert!(iterations > 0);
            // never got past the wall
            assert!(closest_distance_m > 30_000.0);
        }
        other => panic!("expected NoRouteFound, got {other:?}"),
    }
}

#[test]
fn becalmed_region_is_traversable() {
    init_logs();
    // 2 m/s of wind against a polar that only moves from 10 m/s up:
    // every leg is priced at the becalmed floor
    let wind = steady_wind(2.0, 0.0);
    let polar = PolarTable::new(
        vec![0.0, 90.0, 180.0],
        vec![0.0, 5.0, 10.0],
        vec![
            vec![0.0, 0.0, 0.0],
            vec![0.0, 0.0, 6.0],
            vec![0.0, 0.0, 3.0],
        ],
    )
    .unwrap();
    let mask = open_sea();
    let cfg = RouterConfig {
        time_step_s: 1800.0,
        goal_radius_m: 1_000.0,
        min_boat_speed_ms: 0.5,
        ..RouterConfig::default()
    };
    let search = RouteSearch::new(&wind, &polar, &mask, cfg).unwrap();

    let start = Position::new(0.0, 0.0);
    let goal = Position::new(0.0, 0.05);
    let route = search.route(start, goal, departure()).unwrap();

    assert!(route.total_duration_s.is_finite());
    // crawling at the floor speed, give or take the arrival radius
    let crawl_s = haversine_m(start, goal) / 0.5;
    assert!(route.total_duration_s > 0.8 * crawl_s);
    assert!(route
        .waypoints
        .iter()
        .skip(1)
        .all(|wp| (wp.boat_speed_ms - 0.5).abs() < 1e-9));
}

#[test]
fn concurrent_searches_are_deterministic_and_isolated() {
    init_logs();
    let wind = steady_wind(10.0, 0.0);
    let polar = beating_polar();
    let mask = open_sea();
    let search = RouteSearch::new(&wind, &polar, &mask, config()).unwrap();

    let request = RouteRequest {
        start: Position::new(0.0, 0.0),
        goal: Position::new(0.3, 0.8),
        departure: departure(),
    };
    let results = search.route_batch(&[request, request, request]);
    assert_eq!(results.len(), 3);
    let first = results[0].as_ref().unwrap();
    for result in &results {
        assert_eq!(result.as_ref().unwrap(), first);
    }

    // the shared collaborators are untouched: a sequential re-run over
    // the same inputs reproduces the batch answer
    let again = search
        .route(request.start, request.goal, request.departure)
        .unwrap();
    assert_eq!(&again, first);
}

#[test]
fn zero_deadline_cancels_cooperatively() {
    init_logs();
    let wind = steady_wind(10.0, 0.0);
    let polar = beating_polar();
    let mask = open_sea();
    let cfg = RouterConfig {
        deadline: Some(std::time::Duration::ZERO),
        ..config()
    };
    let search = RouteSearch::new(&wind, &polar, &mask, cfg).unwrap();

    let err = search
        .route(Position::new(0.0, 0.0), Position::new(0.0, 1.0), departure())
        .unwrap_err();
    assert!(matches!(
        err,
        RouteError::SearchCancelled {
            reason: CancelReason::Deadline,
            ..
        }
    ));
}
