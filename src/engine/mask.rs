use log::info;
use roaring::RoaringTreemap;

use crate::engine::geo::{self, haversine_m, intermediate_point};
use crate::engine::models::Position;
use crate::error::RouteError;

/// How a query outside the raster's bounding box is classified.
/// Routes often skirt the edge of the loaded raster, so the default is
/// permissive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutsideBounds {
    #[default]
    Sea,
    Land,
}

/// Floor of samples along a segment, whatever its length.
const MIN_SEGMENT_SAMPLES: usize = 6;

/// Cap on samples per segment so a degenerate cell size cannot stall a
/// search.
const MAX_SEGMENT_SAMPLES: usize = 4096;

/// Boolean land/sea raster over a lat/lon bounding box, land cells held
/// in a roaring bitmap keyed `row * n_lon + col`. Loaded once,
/// read-only during search.
pub struct LandMask {
    cells: RoaringTreemap,
    min_lat: f64,
    min_lon: f64,
    resolution_deg: f64,
    n_lat: u64,
    n_lon: u64,
    outside: OutsideBounds,
}

impl LandMask {
    /// All-sea raster covering the given box at `resolution_deg` per
    /// cell.
    pub fn all_sea(
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
        resolution_deg: f64,
    ) -> Result<Self, RouteError> {
        if !(resolution_deg > 0.0) {
            return Err(RouteError::InvalidConfiguration(
                "land mask resolution must be positive".into(),
            ));
        }
        if max_lat <= min_lat || max_lon <= min_lon {
            return Err(RouteError::InvalidConfiguration(
                "land mask bounding box is empty".into(),
            ));
        }

        let n_lat = (((max_lat - min_lat) / resolution_deg).ceil() as u64).max(1);
        let n_lon = (((max_lon - min_lon) / resolution_deg).ceil() as u64).max(1);
        info!("land mask ready: {n_lat}x{n_lon} cells at {resolution_deg} deg");

        Ok(Self {
            cells: RoaringTreemap::new(),
            min_lat,
            min_lon,
            resolution_deg,
            n_lat,
            n_lon,
            outside: OutsideBounds::default(),
        })
    }

    /// Builds the raster from boolean rows, southernmost row first,
    /// `true` = land.
    pub fn from_rows(
        min_lat: f64,
        min_lon: f64,
        resolution_deg: f64,
        rows: &[Vec<bool>],
    ) -> Result<Self, RouteError> {
        let n_lat = rows.len();
        let n_lon = rows.first().map(Vec::len).unwrap_or(0);
        if n_lat == 0 || n_lon == 0 {
            return Err(RouteError::InvalidConfiguration(
                "land mask raster is empty".into(),
            ));
        }
        if rows.iter().any(|row| row.len() != n_lon) {
            return Err(RouteError::InvalidConfiguration(
                "land mask rows have unequal lengths".into(),
            ));
        }

        let mut mask = Self::all_sea(
            min_lat,
            min_lat + n_lat as f64 * resolution_deg,
            min_lon,
            min_lon + n_lon as f64 * resolution_deg,
            resolution_deg,
        )?;
        for (iy, row) in rows.iter().enumerate() {
            for (ix, &land) in row.iter().enumerate() {
                if land {
                    mask.cells.insert(iy as u64 * mask.n_lon + ix as u64);
                }
            }
        }
        Ok(mask)
    }

    /// Sets the classification of queries outside the raster bounds.
    pub fn with_outside_policy(mut self, policy: OutsideBounds) -> Self {
        self.outside = policy;
        self
    }

    /// Marks a rectangular box of cells as land. Test and synthetic
    /// scenario helper.
    pub fn add_land_box(&mut self, min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) {
        let clamp_y = |lat: f64| {
            (((lat - self.min_lat) / self.resolution_deg).floor() as i64)
                .clamp(0, self.n_lat as i64 - 1) as u64
        };
        let clamp_x = |lon: f64| {
            (((lon - self.min_lon) / self.resolution_deg).floor() as i64)
                .clamp(0, self.n_lon as i64 - 1) as u64
        };
        for y in clamp_y(min_lat)..=clamp_y(max_lat) {
            for x in clamp_x(min_lon)..=clamp_x(max_lon) {
                self.cells.insert(y * self.n_lon + x);
            }
        }
    }

    fn cell_index(&self, position: Position) -> Option<u64> {
        let ix = ((position.lon - self.min_lon) / self.resolution_deg).floor();
        let iy = ((position.lat - self.min_lat) / self.resolution_deg).floor();
        if ix < 0.0 || iy < 0.0 || ix >= self.n_lon as f64 || iy >= self.n_lat as f64 {
            return None;
        }
        Some(iy as u64 * self.n_lon + ix as u64)
    }

    /// Whether the coordinate falls on a land cell. Out-of-bounds
    /// queries never panic; they follow the configured policy.
    pub fn is_land(&self, position: Position) -> bool {
        match self.cell_index(position) {
            Some(bit) => self.cells.contains(bit),
            None => self.outside == OutsideBounds::Land,
        }
    }

    /// Whether the great-circle segment between two positions touches
    /// land. Sampled, not exact: consecutive samples are at most half a
    /// raster cell apart, so a one-cell obstacle always covers at least
    /// one sample. Sufficient at routing resolution.
    pub fn segment_crosses_land(&self, from: Position, to: Position) -> bool {
        let distance = haversine_m(from, to);
        let cell_m = self.resolution_deg * geo::METERS_PER_DEGREE;
        let samples = ((2.0 * distance / cell_m).ceil() as usize)
            .clamp(MIN_SEGMENT_SAMPLES, MAX_SEGMENT_SAMPLES);

        for i in 0..=samples {
            let point = intermediate_point(from, to, i as f64 / samples as f64);
            if self.is_land(point) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn biscay_mask() -> LandMask {
        LandMask::all_sea(40.0, 50.0, -10.0, 0.0, 0.1).unwrap()
    }

    #[test]
    fn test_empty_mask_is_all_sea() {
        let mask = biscay_mask();
        assert!(!mask.is_land(Position::new(45.0, -5.0)));
        assert!(!mask.segment_crosses_land(
            Position::new(44.0, -6.0),
            Position::new(46.0, -3.0)
        ));
    }

    #[test]
    fn test_land_box_classification() {
        let mut mask = biscay_mask();
        mask.add_land_box(44.0, 45.0, -6.0, -5.0);
        assert!(mask.is_land(Position::new(44.5, -5.5)));
        assert!(!mask.is_land(Position::new(43.0, -5.5)));
    }

    #[test]
    fn test_out_of_bounds_policy() {
        let mask = biscay_mask();
        // default: permissive
        assert!(!mask.is_land(Position::new(55.0, -5.0)));

        let strict = biscay_mask().with_outside_policy(OutsideBounds::Land);
        assert!(strict.is_land(Position::new(55.0, -5.0)));
        assert!(!strict.is_land(Position::new(45.0, -5.0)));
    }

    #[test]
    fn test_segment_crossing_detects_thin_barrier() {
        let mut mask = biscay_mask();
        // one-cell-wide wall between the endpoints
        mask.add_land_box(44.0, 44.05, -8.0, -2.0);
        let south = Position::new(42.0, -5.0);
        let north = Position::new(46.0, -5.0);
        assert!(mask.segment_crosses_land(south, north));
        // a segment staying south of the wall is clear
        assert!(!mask.segment_crosses_land(south, Position::new(43.5, -3.0)));
    }

    #[test]
    fn test_from_rows() {
        let rows = vec![
            vec![false, false, false],
            vec![false, true, false],
            vec![false, false, false],
        ];
        let mask = LandMask::from_rows(0.0, 0.0, 1.0, &rows).unwrap();
        assert!(mask.is_land(Position::new(1.5, 1.5)));
        assert!(!mask.is_land(Position::new(0.5, 1.5)));
        assert!(!mask.is_land(Position::new(2.5, 2.5)));

        assert!(LandMask::from_rows(0.0, 0.0, 1.0, &[]).is_err());
        let ragged = vec![vec![false], vec![false, true]];
        assert!(LandMask::from_rows(0.0, 0.0, 1.0, &ragged).is_err());
    }

    #[test]
    fn test_rejects_bad_bounds() {
        assert!(LandMask::all_sea(50.0, 40.0, -10.0, 0.0, 0.1).is_err());
        assert!(LandMask::all_sea(40.0, 50.0, -10.0, 0.0, 0.0).is_err());
    }
}
