use crate::types::{DiagsError, DiagsResult};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayView2};

/// Thin singular value decomposition `A = U * diag(s) * Vt`
#[derive(Debug, Clone)]
pub struct SvdFactors {
    /// Left singular vectors, (rows, k)
    pub u: Array2<f64>,
    /// Singular values in descending order, (k)
    pub s: Array1<f64>,
    /// Right singular vectors transposed, (k, cols)
    pub vt: Array2<f64>,
}

/// Decompose a finite 2-D field
pub fn deconstruct(data: ArrayView2<f64>) -> DiagsResult<SvdFactors> {
    let (rows, cols) = data.dim();
    if rows == 0 || cols == 0 {
        return Err(DiagsError::Transform(format!(
            "SVD needs a non-empty array, received shape ({}, {})",
            rows, cols
        )));
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(DiagsError::Transform(
            "SVD input contains non-finite values".to_string(),
        ));
    }

    log::info!("Computing SVD of shape ({}, {})", rows, cols);
    let matrix = DMatrix::from_fn(rows, cols, |i, j| data[[i, j]]);
    let svd = matrix.svd(true, true);
    let u = svd
        .u
        .ok_or_else(|| DiagsError::Transform("SVD did not produce U".to_string()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| DiagsError::Transform("SVD did not produce V^T".to_string()))?;

    let k = svd.singular_values.len();
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| svd.singular_values[b].total_cmp(&svd.singular_values[a]));

    Ok(SvdFactors {
        u: Array2::from_shape_fn((rows, k), |(i, c)| u[(i, order[c])]),
        s: order.iter().map(|&c| svd.singular_values[c]).collect(),
        vt: Array2::from_shape_fn((k, cols), |(r, j)| v_t[(order[r], j)]),
    })
}

/// Multiply the factors back into a field
pub fn reconstruct(factors: &SvdFactors) -> DiagsResult<Array2<f64>> {
    let k = factors.s.len();
    if factors.u.ncols() != k || factors.vt.nrows() != k {
        return Err(DiagsError::Transform(format!(
            "inconsistent SVD factors: U {:?}, s {}, Vt {:?}",
            factors.u.dim(),
            k,
            factors.vt.dim()
        )));
    }

    let mut scaled = factors.u.clone();
    for (mut column, &sigma) in scaled.columns_mut().into_iter().zip(factors.s.iter()) {
        column *= sigma;
    }
    Ok(scaled.dot(&factors.vt))
}

/// Zero the leading `ncoeffs` singular values and rebuild the field
pub fn rebuild(data: ArrayView2<f64>, ncoeffs: usize) -> DiagsResult<Array2<f64>> {
    let mut factors = deconstruct(data)?;
    let cut = ncoeffs.min(factors.s.len());
    log::debug!("Zeroing {} of {} singular values", cut, factors.s.len());
    factors.s.slice_mut(ndarray::s![..cut]).fill(0.0);
    reconstruct(&factors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn sample() -> Array2<f64> {
        array![[4.0, 1.0, 0.5], [2.0, 3.0, 1.0], [0.0, 1.0, 5.0], [1.0, 0.0, 2.0]]
    }

    #[test]
    fn test_singular_values_descending() {
        let factors = deconstruct(sample().view()).unwrap();
        assert_eq!(factors.u.dim(), (4, 3));
        assert_eq!(factors.vt.dim(), (3, 3));
        for w in factors.s.windows(2) {
            assert!(w[0] >= w[1]);
        }
    }

    #[test]
    fn test_rebuild_without_zeroing_is_identity() {
        let data = sample();
        let out = rebuild(data.view(), 0).unwrap();
        for (a, b) in out.iter().zip(data.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_rebuild_all_zeroed() {
        let out = rebuild(sample().view(), 10).unwrap();
        assert!(out.iter().all(|v| v.abs() < 1e-10));
    }

    #[test]
    fn test_rank_one_removed() {
        let data = array![[1.0, 2.0], [2.0, 4.0]];
        let out = rebuild(data.view(), 1).unwrap();
        assert!(out.iter().all(|v| v.abs() < 1e-10));
    }

    #[test]
    fn test_non_finite_rejected() {
        let data = array![[1.0, f64::NAN], [0.0, 1.0]];
        assert!(matches!(deconstruct(data.view()), Err(DiagsError::Transform(_))));
    }

    #[test]
    fn test_inconsistent_factors() {
        let mut factors = deconstruct(sample().view()).unwrap();
        factors.s = array![1.0, 2.0];
        assert!(reconstruct(&factors).is_err());
    }
}
