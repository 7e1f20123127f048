use crate::types::{DiagsError, DiagsResult, Stage};
use ndarray::{Array3, ArrayView1, ArrayView3, Axis};

/// Linear interpolation of one column profile to level `lev`
///
/// The column coordinate may increase or decrease with index. Returns NaN
/// when `lev` is outside the column's range or the bracketing samples are
/// not finite.
pub fn interp_column(values: ArrayView1<f64>, coord: ArrayView1<f64>, lev: f64) -> f64 {
    if !lev.is_finite() {
        return f64::NAN;
    }

    for k in 0..coord.len().saturating_sub(1) {
        let (z0, z1) = (coord[k], coord[k + 1]);
        let (lo, hi) = if z0 <= z1 { (z0, z1) } else { (z1, z0) };
        if !(lo <= lev && lev <= hi) {
            continue;
        }

        let (v0, v1) = (values[k], values[k + 1]);
        if z0 == z1 {
            return if v0.is_finite() { v0 } else { f64::NAN };
        }
        let w = (lev - z0) / (z1 - z0);
        return v0 + (v1 - v0) * w;
    }

    f64::NAN
}

/// Interpolate an `(nz, ny, nx)` variable to the requested levels of a
/// same-shape vertical coordinate
///
/// # Returns
/// * `(levels.len(), ny, nx)` array
pub fn interp_levels(
    values: ArrayView3<f64>,
    coord: ArrayView3<f64>,
    levels: &[f64],
) -> DiagsResult<Array3<f64>> {
    if values.dim() != coord.dim() {
        return Err(DiagsError::precondition(
            Stage::VerticalInterpolation,
            format!(
                "variable {:?} and vertical coordinate {:?} must share one shape",
                values.dim(),
                coord.dim()
            ),
        ));
    }
    if levels.is_empty() {
        return Err(DiagsError::precondition(
            Stage::VerticalInterpolation,
            "at least one target level is required",
        ));
    }

    let (nz, ny, nx) = values.dim();
    log::debug!(
        "Vertical interpolation of {} levels over {} columns to {} levels",
        nz,
        ny * nx,
        levels.len()
    );

    let column = |idx: usize| -> Vec<f64> {
        let (j, i) = (idx / nx, idx % nx);
        let v = values.index_axis(Axis(2), i);
        let v = v.index_axis(Axis(1), j);
        let z = coord.index_axis(Axis(2), i);
        let z = z.index_axis(Axis(1), j);
        levels.iter().map(|&lev| interp_column(v, z, lev)).collect()
    };

    #[cfg(feature = "parallel")]
    let columns: Vec<Vec<f64>> = {
        use rayon::prelude::*;
        (0..ny * nx).into_par_iter().map(column).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let columns: Vec<Vec<f64>> = (0..ny * nx).map(column).collect();

    let mut out = Array3::from_elem((levels.len(), ny, nx), f64::NAN);
    for (idx, profile) in columns.into_iter().enumerate() {
        let (j, i) = (idx / nx, idx % nx);
        for (l, v) in profile.into_iter().enumerate() {
            out[[l, j, i]] = v;
        }
    }

    Ok(out)
}
