use chrono::{DateTime, Utc};
use thiserror::Error;

/// What tripped the cooperative cancellation check inside the search loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    IterationCap,
    Deadline,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelReason::IterationCap => write!(f, "iteration cap"),
            CancelReason::Deadline => write!(f, "wall-clock deadline"),
        }
    }
}

/// Error taxonomy of the routing core. Every failure aborts the current
/// search and surfaces as one of these kinds; none are swallowed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// A wind sample was requested outside the field's time coverage.
    /// Propagated rather than clamped so stale wind data is never
    /// silently trusted.
    #[error("wind requested at {requested} outside coverage [{coverage_start} .. {coverage_end}]")]
    OutOfTemporalRange {
        requested: DateTime<Utc>,
        coverage_start: DateTime<Utc>,
        coverage_end: DateTime<Utc>,
    },

    /// The open set was exhausted without reaching the goal: the
    /// destination is land-locked or lies beyond the search horizon.
    #[error("no route found after {iterations} iterations (closest approach {closest_distance_m:.0} m)")]
    NoRouteFound {
        iterations: u64,
        closest_distance_m: f64,
    },

    /// The search hit its iteration cap or wall-clock deadline. A
    /// truncated frontier has no optimality guarantee, so no partial
    /// route is reported.
    #[error("search cancelled by {reason} after {iterations} iterations")]
    SearchCancelled {
        reason: CancelReason,
        iterations: u64,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Route reconstruction received an empty state chain. Unreachable
    /// given the search contract; seeing this means an internal
    /// invariant was violated.
    #[error("route reconstruction received an empty state chain")]
    EmptyPath,
}
