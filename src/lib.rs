//! Sailing weather router: near-optimal routes between two geographic
//! points under a time-varying wind field, a boat polar and a land/sea
//! mask.
//!
//! The core is an A* search over position x time x heading. The
//! long-lived inputs (wind grid, polar table, land mask) are loaded
//! once by the caller and shared by reference; each search invocation
//! owns its frontier exclusively, so batch routing runs searches in
//! parallel without locks.
//!
//! ```no_run
//! use chrono::Utc;
//! use windroute::{
//!     LandMask, PolarTable, Position, RouteSearch, RouterConfig, WindGrid, WindSample,
//! };
//!
//! # fn main() -> Result<(), windroute::RouteError> {
//! let departure = Utc::now();
//! let wind = WindGrid::constant(
//!     WindSample::new(10.0, 0.0),
//!     departure,
//!     departure + chrono::Duration::days(5),
//! )?;
//! let polar = PolarTable::new(
//!     vec![0.0, 45.0, 90.0, 135.0, 180.0],
//!     vec![0.0, 10.0],
//!     vec![
//!         vec![0.0, 0.0],
//!         vec![0.0, 4.0],
//!         vec![0.0, 6.0],
//!         vec![0.0, 5.0],
//!         vec![0.0, 3.0],
//!     ],
//! )?;
//! let mask = LandMask::all_sea(40.0, 50.0, -10.0, 0.0, 0.1)?;
//!
//! let search = RouteSearch::new(&wind, &polar, &mask, RouterConfig::default())?;
//! let route = search.route(
//!     Position::new(47.0, -5.0),
//!     Position::new(44.0, -4.0),
//!     departure,
//! )?;
//! println!("{:.1} nm in {:.1} h", route.distance_nm(), route.duration_hours());
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;

pub use engine::heuristic::{Heuristic, HeuristicMode};
pub use engine::mask::{LandMask, OutsideBounds};
pub use engine::models::{Maneuver, Position, Route, SearchState, Waypoint, WindSample};
pub use engine::polar::PolarTable;
pub use engine::router::{RouteRequest, RouteSearch, RouterConfig};
pub use engine::wind::{WindGrid, WindSource};
pub use error::{CancelReason, RouteError};
