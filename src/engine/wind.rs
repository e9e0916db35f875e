use chrono::{DateTime, Utc};
use log::info;

use crate::engine::models::{Position, WindSample};
use crate::error::RouteError;

/// A time-varying wind field the routing core can sample. Implemented
/// by the in-memory grid below; a live weather-API adapter implements
/// the same contract and the core cannot tell them apart.
pub trait WindSource: Sync {
    /// Wind at a position and instant. Must fail with
    /// [`RouteError::OutOfTemporalRange`] for instants outside the
    /// field's time coverage rather than extrapolate.
    fn sample(&self, position: Position, time: DateTime<Utc>)
        -> Result<WindSample, RouteError>;

    /// Most-recent-known wind: `time` is clamped into the field's
    /// coverage before sampling. Only the heuristic uses this; edge
    /// pricing always goes through [`sample`](Self::sample) so stale
    /// data is never silently trusted.
    fn sample_clamped(&self, position: Position, time: DateTime<Utc>)
        -> Result<WindSample, RouteError>;
}

/// One forecast time slice: U/V components on the grid, row-major with
/// latitude rows ordered south to north.
struct WindSlice {
    valid_time: DateTime<Utc>,
    u: Vec<f32>,
    v: Vec<f32>,
}

/// Regular lat/lon grid of wind components over an ordered sequence of
/// forecast slices. Loaded once (by the excluded GRIB/API adapters),
/// read-only afterwards; safely shared by reference across concurrent
/// searches.
pub struct WindGrid {
    origin: Position,
    lat_step: f64,
    lon_step: f64,
    n_lat: usize,
    n_lon: usize,
    slices: Vec<WindSlice>,
}

impl WindGrid {
    /// Builds a grid from component slices. `slices` holds
    /// `(valid_time, u, v)` with both component vectors in row-major
    /// `n_lat * n_lon` layout; valid times must be strictly increasing.
    pub fn new(
        origin: Position,
        lat_step: f64,
        lon_step: f64,
        n_lat: usize,
        n_lon: usize,
        slices: Vec<(DateTime<Utc>, Vec<f32>, Vec<f32>)>,
    ) -> Result<Self, RouteError> {
        if !(lat_step > 0.0) || !(lon_step > 0.0) {
            return Err(RouteError::InvalidConfiguration(
                "wind grid steps must be positive".into(),
            ));
        }
        if n_lat == 0 || n_lon == 0 {
            return Err(RouteError::InvalidConfiguration(
                "wind grid must have at least one cell per axis".into(),
            ));
        }
        if slices.is_empty() {
            return Err(RouteError::InvalidConfiguration(
                "wind grid needs at least one time slice".into(),
            ));
        }

        let cells = n_lat * n_lon;
        let mut prev_time: Option<DateTime<Utc>> = None;
        let mut built = Vec::with_capacity(slices.len());
        for (valid_time, u, v) in slices {
            if u.len() != cells || v.len() != cells {
                return Err(RouteError::InvalidConfiguration(format!(
                    "wind slice at {valid_time} has {}x{} components, expected {cells}",
                    u.len(),
                    v.len()
                )));
            }
            if let Some(prev) = prev_time {
                if valid_time <= prev {
                    return Err(RouteError::InvalidConfiguration(
                        "wind slices must have strictly increasing valid times".into(),
                    ));
                }
            }
            prev_time = Some(valid_time);
            built.push(WindSlice { valid_time, u, v });
        }

        info!(
            "wind grid ready: {n_lat}x{n_lon} points, {} slices, coverage {} .. {}",
            built.len(),
            built.first().map(|s| s.valid_time).unwrap_or_default(),
            built.last().map(|s| s.valid_time).unwrap_or_default(),
        );

        Ok(Self {
            origin,
            lat_step,
            lon_step,
            n_lat,
            n_lon,
            slices: built,
        })
    }

    /// Globe-covering field with the same wind everywhere, valid over
    /// `[start, end]`. Handy for tests and synthetic scenarios.
    pub fn constant(
        wind: WindSample,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, RouteError> {
        let (u, v) = wind.components();
        let (u, v) = (u as f32, v as f32);
        let slice = |t| (t, vec![u; 4], vec![v; 4]);
        Self::new(
            Position::new(-90.0, -180.0),
            180.0,
            360.0,
            2,
            2,
            vec![slice(start), slice(end)],
        )
    }

    /// First and last slice times.
    pub fn coverage(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        // new() guarantees at least one slice
        let first = self.slices.first().map(|s| s.valid_time).unwrap_or_default();
        let last = self.slices.last().map(|s| s.valid_time).unwrap_or_default();
        (first, last)
    }

    /// Fractional index along one axis, clamped to the grid so spatial
    /// queries outside the field extrapolate from the nearest edge.
    fn axis_index(value: f64, origin: f64, step: f64, count: usize) -> (usize, usize, f64) {
        let fx = ((value - origin) / step).clamp(0.0, (count - 1) as f64);
        let i0 = fx.floor() as usize;
        let i1 = (i0 + 1).min(count - 1);
        (i0, i1, fx - i0 as f64)
    }

    /// Bilinear interpolation of one slice's components at a position.
    fn interpolate_slice(&self, slice: &WindSlice, position: Position) -> (f64, f64) {
        let (iy0, iy1, fy) =
            Self::axis_index(position.lat, self.origin.lat, self.lat_step, self.n_lat);
        let (ix0, ix1, fx) =
            Self::axis_index(position.lon, self.origin.lon, self.lon_step, self.n_lon);

        let at = |grid: &[f32], iy: usize, ix: usize| grid[iy * self.n_lon + ix] as f64;
        let bilinear = |grid: &[f32]| {
            let v00 = at(grid, iy0, ix0);
            let v01 = at(grid, iy0, ix1);
            let v10 = at(grid, iy1, ix0);
            let v11 = at(grid, iy1, ix1);
            let low = v00 * (1.0 - fx) + v01 * fx;
            let high = v10 * (1.0 - fx) + v11 * fx;
            low * (1.0 - fy) + high * fy
        };

        (bilinear(&slice.u), bilinear(&slice.v))
    }

    /// Sampling core once `time` is known to be inside coverage.
    fn sample_inside(&self, position: Position, time: DateTime<Utc>) -> WindSample {
        let after = self
            .slices
            .partition_point(|s| s.valid_time <= time)
            .min(self.slices.len() - 1);
        let before = after.saturating_sub(1);

        let (u0, v0) = self.interpolate_slice(&self.slices[before], position);
        if before == after {
            return WindSample::from_components(u0, v0);
        }

        let t0 = self.slices[before].valid_time;
        let t1 = self.slices[after].valid_time;
        let span_ms = (t1 - t0).num_milliseconds() as f64;
        let frac = if span_ms > 0.0 {
            ((time - t0).num_milliseconds() as f64 / span_ms).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let (u1, v1) = self.interpolate_slice(&self.slices[after], position);
        WindSample::from_components(u0 + (u1 - u0) * frac, v0 + (v1 - v0) * frac)
    }
}

impl WindSource for WindGrid {
    fn sample(
        &self,
        position: Position,
        time: DateTime<Utc>,
    ) -> Result<WindSample, RouteError> {
        let (start, end) = self.coverage();
        if time < start || time > end {
            return Err(RouteError::OutOfTemporalRange {
                requested: time,
                coverage_start: start,
                coverage_end: end,
            });
        }
        Ok(self.sample_inside(position, time))
    }

    fn sample_clamped(
        &self,
        position: Position,
        time: DateTime<Utc>,
    ) -> Result<WindSample, RouteError> {
        let (start, end) = self.coverage();
        Ok(self.sample_inside(position, time.clamp(start, end)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 8, hour, 0, 0).unwrap()
    }

    /// 2x2 grid over [45,46]x[-2,-1] with distinct per-node winds.
    fn small_grid() -> WindGrid {
        // row-major, south row first
        let u0 = vec![1.0, 2.0, 3.0, 4.0];
        let v0 = vec![-1.0, -2.0, -3.0, -4.0];
        let u1: Vec<f32> = u0.iter().map(|x| x * 2.0).collect();
        let v1: Vec<f32> = v0.iter().map(|x| x * 2.0).collect();
        WindGrid::new(
            Position::new(45.0, -2.0),
            1.0,
            1.0,
            2,
            2,
            vec![(t(0), u0, v0), (t(6), u1, v1)],
        )
        .unwrap()
    }

    #[test]
    fn test_grid_node_identity() {
        let grid = small_grid();
        // north-east node of the first slice: u=4, v=-4
        let sample = grid.sample(Position::new(46.0, -1.0), t(0)).unwrap();
        let expected = WindSample::from_components(4.0, -4.0);
        assert!((sample.speed_ms - expected.speed_ms).abs() < 1e-9);
        assert!((sample.direction_deg - expected.direction_deg).abs() < 1e-9);
    }

    #[test]
    fn test_spatial_interpolation_and_edge_clamp() {
        let grid = small_grid();
        // centre of the cell: mean of the four nodes
        let centre = grid.sample(Position::new(45.5, -1.5), t(0)).unwrap();
        let expected = WindSample::from_components(2.5, -2.5);
        assert!((centre.speed_ms - expected.speed_ms).abs() < 1e-9);

        // far outside the grid clamps to the nearest corner
        let clamped = grid.sample(Position::new(80.0, 30.0), t(0)).unwrap();
        let corner = grid.sample(Position::new(46.0, -1.0), t(0)).unwrap();
        assert_eq!(clamped, corner);
    }

    #[test]
    fn test_temporal_interpolation() {
        let grid = small_grid();
        // halfway between slices the components double -> factor 1.5
        let sample = grid.sample(Position::new(45.0, -2.0), t(3)).unwrap();
        let expected = WindSample::from_components(1.5, -1.5);
        assert!((sample.speed_ms - expected.speed_ms).abs() < 1e-9);
        assert!((sample.direction_deg - expected.direction_deg).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_temporal_range() {
        let grid = small_grid();
        let before = grid.sample(Position::new(45.5, -1.5), t(0) - chrono::Duration::hours(1));
        assert!(matches!(
            before,
            Err(RouteError::OutOfTemporalRange { .. })
        ));
        let after = grid.sample(Position::new(45.5, -1.5), t(12));
        assert!(matches!(after, Err(RouteError::OutOfTemporalRange { .. })));

        // clamped sampling keeps answering at the coverage edges
        let clamped = grid
            .sample_clamped(Position::new(45.0, -2.0), t(12))
            .unwrap();
        let last = grid.sample(Position::new(45.0, -2.0), t(6)).unwrap();
        assert_eq!(clamped, last);
    }

    #[test]
    fn test_sample_invariants() {
        let grid = small_grid();
        for lat in [44.0, 45.3, 45.9, 47.0] {
            for lon in [-2.4, -1.7, -1.1, 0.0] {
                for hour in [0, 2, 5, 6] {
                    let s = grid.sample(Position::new(lat, lon), t(hour)).unwrap();
                    assert!(s.speed_ms >= 0.0);
                    assert!((0.0..360.0).contains(&s.direction_deg));
                }
            }
        }
    }

    #[test]
    fn test_rejects_malformed_grids() {
        let bad_len = WindGrid::new(
            Position::new(0.0, 0.0),
            1.0,
            1.0,
            2,
            2,
            vec![(t(0), vec![0.0; 3], vec![0.0; 4])],
        );
        assert!(matches!(
            bad_len,
            Err(RouteError::InvalidConfiguration(_))
        ));

        let bad_times = WindGrid::new(
            Position::new(0.0, 0.0),
            1.0,
            1.0,
            2,
            2,
            vec![
                (t(6), vec![0.0; 4], vec![0.0; 4]),
                (t(0), vec![0.0; 4], vec![0.0; 4]),
            ],
        );
        assert!(matches!(
            bad_times,
            Err(RouteError::InvalidConfiguration(_))
        ));
    }
}
