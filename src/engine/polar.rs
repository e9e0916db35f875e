use log::{info, warn};

use crate::engine::geo::wrap_180;
use crate::error::RouteError;

/// Boat speed as a function of true wind angle and true wind speed.
/// Rows are TWA in degrees, columns TWS in m/s, values boat speed in
/// m/s: `speeds[twa_idx][tws_idx]`. Loaded once (by the excluded polar
/// file loader), read-only during search.
#[derive(Debug, Clone)]
pub struct PolarTable {
    twa: Vec<f64>,
    tws: Vec<f64>,
    speeds: Vec<Vec<f64>>,
}

impl PolarTable {
    pub fn new(
        twa_deg: Vec<f64>,
        tws_ms: Vec<f64>,
        speeds_ms: Vec<Vec<f64>>,
    ) -> Result<Self, RouteError> {
        if twa_deg.is_empty() || tws_ms.is_empty() {
            return Err(RouteError::InvalidConfiguration(
                "polar table needs at least one TWA row and one TWS column".into(),
            ));
        }
        if !twa_deg.windows(2).all(|w| w[0] < w[1]) || !tws_ms.windows(2).all(|w| w[0] < w[1]) {
            return Err(RouteError::InvalidConfiguration(
                "polar axes must be strictly increasing".into(),
            ));
        }
        if twa_deg.iter().any(|&a| !(0.0..=180.0).contains(&a)) {
            return Err(RouteError::InvalidConfiguration(
                "polar TWA rows must lie in [0, 180]".into(),
            ));
        }
        if tws_ms.iter().any(|&w| w < 0.0) {
            return Err(RouteError::InvalidConfiguration(
                "polar TWS columns must be non-negative".into(),
            ));
        }
        if speeds_ms.len() != twa_deg.len()
            || speeds_ms.iter().any(|row| row.len() != tws_ms.len())
        {
            return Err(RouteError::InvalidConfiguration(format!(
                "polar matrix shape mismatch: expected {}x{}",
                twa_deg.len(),
                tws_ms.len()
            )));
        }

        let mut speeds = speeds_ms;
        let mut clamped = 0usize;
        for row in &mut speeds {
            for v in row.iter_mut() {
                if *v < 0.0 {
                    *v = 0.0;
                    clamped += 1;
                }
            }
        }
        if clamped > 0 {
            warn!("polar table: clamped {clamped} negative speeds to zero");
        }

        info!(
            "polar table ready: {} TWA rows x {} TWS columns",
            twa_deg.len(),
            tws_ms.len()
        );

        Ok(Self {
            twa: twa_deg,
            tws: tws_ms,
            speeds,
        })
    }

    pub fn twa_rows(&self) -> &[f64] {
        &self.twa
    }

    /// Bracketing indices and interpolation fraction for a clamped
    /// value on an ascending axis.
    fn bracket(axis: &[f64], value: f64) -> (usize, usize, f64) {
        let v = value.clamp(axis[0], axis[axis.len() - 1]);
        let i = axis.partition_point(|&x| x < v);
        let low = i.saturating_sub(1);
        let high = i.min(axis.len() - 1);
        let frac = if axis[high] > axis[low] {
            (v - axis[low]) / (axis[high] - axis[low])
        } else {
            0.0
        };
        (low, high, frac)
    }

    /// Interpolated boat speed in m/s. TWA is normalized to [0, 180]
    /// first; lookups outside the grid clamp to the nearest edge.
    pub fn speed(&self, twa_deg: f64, tws_ms: f64) -> f64 {
        let twa = wrap_180(twa_deg).abs();
        let (i_low, i_high, ty) = Self::bracket(&self.twa, twa);
        let (j_low, j_high, tx) = Self::bracket(&self.tws, tws_ms.max(0.0));

        let v_ll = self.speeds[i_low][j_low];
        let v_lh = self.speeds[i_low][j_high];
        let v_hl = self.speeds[i_high][j_low];
        let v_hh = self.speeds[i_high][j_high];

        let speed = v_ll * (1.0 - tx) * (1.0 - ty)
            + v_lh * tx * (1.0 - ty)
            + v_hl * (1.0 - tx) * ty
            + v_hh * tx * ty;
        speed.max(0.0)
    }

    /// TWA row maximizing upwind VMG (`speed * cos(twa)`) at the given
    /// wind speed. Ties go to the smaller angle.
    pub fn best_vmg_angle(&self, tws_ms: f64) -> f64 {
        self.scan_vmg(tws_ms, |twa| twa.to_radians().cos())
    }

    /// TWA row maximizing downwind VMG (`speed * -cos(twa)`). Ties go
    /// to the smaller angle.
    pub fn best_downwind_vmg_angle(&self, tws_ms: f64) -> f64 {
        self.scan_vmg(tws_ms, |twa| -twa.to_radians().cos())
    }

    fn scan_vmg(&self, tws_ms: f64, projection: impl Fn(f64) -> f64) -> f64 {
        let mut best_angle = self.twa[0];
        let mut best_vmg = f64::NEG_INFINITY;
        for &twa in &self.twa {
            let vmg = self.speed(twa, tws_ms) * projection(twa);
            if vmg > best_vmg {
                best_vmg = vmg;
                best_angle = twa;
            }
        }
        best_angle
    }

    /// Fastest speed anywhere in the table. Upper bound on what the
    /// boat can ever sail, used by the conservative heuristic.
    pub fn max_speed(&self) -> f64 {
        self.speeds
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f64::max)
    }
}
