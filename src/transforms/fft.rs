use crate::types::{DiagsError, DiagsResult};
use ndarray::{Array2, ArrayView2, Axis};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Run `fft` over every lane of `data` along `axis`
fn transform_lanes(data: &mut Array2<Complex<f64>>, axis: Axis, fft: &Arc<dyn Fft<f64>>) {
    let mut buffer = Vec::with_capacity(data.len_of(axis));
    for mut lane in data.lanes_mut(axis) {
        buffer.clear();
        buffer.extend(lane.iter().copied());
        fft.process(&mut buffer);
        lane.iter_mut().zip(buffer.iter()).for_each(|(dst, &src)| *dst = src);
    }
}

fn check_shape(rows: usize, cols: usize) -> DiagsResult<()> {
    if rows == 0 || cols == 0 {
        return Err(DiagsError::Transform(format!(
            "2-D FFT needs a non-empty array, received shape ({}, {})",
            rows, cols
        )));
    }
    Ok(())
}

/// Forward 2-D discrete Fourier transform of a real field (unnormalised)
pub fn forward_fft2d(data: ArrayView2<f64>) -> DiagsResult<Array2<Complex<f64>>> {
    let (rows, cols) = data.dim();
    check_shape(rows, cols)?;
    log::info!("Computing forward 2-D FFT of shape ({}, {})", rows, cols);

    let mut spectrum = data.mapv(|v| Complex::new(v, 0.0));
    let mut planner = FftPlanner::new();
    let fft_rows = planner.plan_fft_forward(cols);
    let fft_cols = planner.plan_fft_forward(rows);

    transform_lanes(&mut spectrum, Axis(1), &fft_rows);
    transform_lanes(&mut spectrum, Axis(0), &fft_cols);
    Ok(spectrum)
}

/// Inverse 2-D discrete Fourier transform, normalised by 1/(rows*cols)
pub fn inverse_fft2d(spectrum: ArrayView2<Complex<f64>>) -> DiagsResult<Array2<Complex<f64>>> {
    let (rows, cols) = spectrum.dim();
    check_shape(rows, cols)?;
    log::info!("Computing inverse 2-D FFT of shape ({}, {})", rows, cols);

    let mut data = spectrum.to_owned();
    let mut planner = FftPlanner::new();
    let ifft_rows = planner.plan_fft_inverse(cols);
    let ifft_cols = planner.plan_fft_inverse(rows);

    transform_lanes(&mut data, Axis(1), &ifft_rows);
    transform_lanes(&mut data, Axis(0), &ifft_cols);

    let scale = 1.0 / (rows * cols) as f64;
    data.mapv_inplace(|c| c * scale);
    Ok(data)
}
