use ndarray::{Array1, ArrayView1};
use num_traits::Float;

/// Fill NaN runs in place by linear interpolation between the nearest finite
/// neighbours (in index space)
///
/// Runs touching either end hold the nearest finite value. An all-NaN slice
/// is left untouched; callers that need a value must check for that case.
///
/// # Returns
/// * Number of entries that were filled
pub fn fill_gaps<T: Float>(values: &mut [T]) -> usize {
    let n = values.len();
    let mut filled = 0;
    let mut last_valid: Option<usize> = None;
    let mut i = 0;

    while i < n {
        if !values[i].is_nan() {
            last_valid = Some(i);
            i += 1;
            continue;
        }

        let run_start = i;
        while i < n && values[i].is_nan() {
            i += 1;
        }
        let next_valid = if i < n { Some(i) } else { None };

        match (last_valid, next_valid) {
            (Some(lo), Some(hi)) => {
                let v_lo = values[lo];
                let v_hi = values[hi];
                let span = T::from(hi - lo).unwrap_or_else(T::one);
                for k in run_start..i {
                    let offset = T::from(k - lo).unwrap_or_else(T::zero);
                    values[k] = v_lo + (v_hi - v_lo) * offset / span;
                }
            }
            (Some(lo), None) => {
                let hold = values[lo];
                values[run_start..i].iter_mut().for_each(|v| *v = hold);
            }
            (None, Some(hi)) => {
                let hold = values[hi];
                values[run_start..i].iter_mut().for_each(|v| *v = hold);
            }
            (None, None) => {
                log::warn!("Gap fill received {} values with no finite entry", n);
                return 0;
            }
        }
        filled += i - run_start;
    }

    filled
}

/// Gap-filled copy of a 1-D array
pub fn gap_filled<T: Float>(values: ArrayView1<T>) -> Array1<T> {
    let mut out: Vec<T> = values.iter().copied().collect();
    fill_gaps(&mut out);
    Array1::from(out)
}
