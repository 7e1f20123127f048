use crate::interp::scattered::ScatteredInterpolator;
use crate::types::{
    require_positive, DiagsConfig, DiagsError, DiagsResult, Field2, InterpMethod, Stage,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameters for successive radial gap filling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadialFillParams {
    /// Distance from the void center where filling starts (meters)
    pub max_dist: f64,
    /// Width of each annulus (meters)
    pub step: f64,
    /// Scattered interpolation scheme used on every pass
    pub method: InterpMethod,
}

impl Default for RadialFillParams {
    fn default() -> Self {
        Self {
            max_dist: 0.0,
            step: 1000.0,
            method: InterpMethod::Linear,
        }
    }
}

impl RadialFillParams {
    /// Parameters using the configured default interpolation scheme
    pub fn from_config(config: &DiagsConfig, max_dist: f64, step: f64) -> Self {
        Self {
            max_dist,
            step,
            method: config.default_method,
        }
    }
}

/// One inward step of the fill: cells closer than `inner_dist` are cleared
/// and rebuilt from everything outside it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnulusPass {
    pub index: usize,
    pub outer_dist: f64,
    pub inner_dist: f64,
}

impl fmt::Display for AnnulusPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pass {} ({:.1} m to {:.1} m)",
            self.index, self.inner_dist, self.outer_dist
        )
    }
}

/// Annulus schedule for a fill starting at `max_dist` and moving inward by `step`
///
/// Pass k (from 1) spans `[max_dist - k*step, max_dist - (k-1)*step]`; the
/// schedule stops before the inner distance goes negative, so `max_dist = 0`
/// yields no passes.
pub fn annulus_passes(max_dist: f64, step: f64) -> Vec<AnnulusPass> {
    if !(max_dist.is_finite() && step.is_finite() && step > 0.0) {
        return Vec::new();
    }

    let mut passes = Vec::new();
    let mut k = 1usize;
    loop {
        let inner_dist = max_dist - k as f64 * step;
        if inner_dist < 0.0 {
            break;
        }
        passes.push(AnnulusPass {
            index: k,
            outer_dist: max_dist - (k - 1) as f64 * step,
            inner_dist,
        });
        k += 1;
    }
    passes
}

/// Successive radial-interval interpolator for data voids
pub struct RadialGapFiller {
    params: RadialFillParams,
}

impl RadialGapFiller {
    pub fn new(params: RadialFillParams) -> DiagsResult<Self> {
        if !(params.max_dist.is_finite() && params.max_dist >= 0.0) {
            return Err(DiagsError::precondition(
                Stage::GapFilling,
                format!(
                    "max_dist must be finite and >= 0, received {}",
                    params.max_dist
                ),
            ));
        }
        require_positive(Stage::GapFilling, "step", params.step)?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &RadialFillParams {
        &self.params
    }

    pub fn passes(&self) -> Vec<AnnulusPass> {
        annulus_passes(self.params.max_dist, self.params.step)
    }

    /// Rebuild the void in `values` working inward from `max_dist`
    ///
    /// `distance` holds each cell's distance from the void center. The
    /// caller's arrays are never modified. Interpolation happens in
    /// (column, row) index space. A failure on any pass aborts the fill.
    pub fn fill(&self, values: &Field2, distance: &Field2) -> DiagsResult<Field2> {
        if values.dim() != distance.dim() {
            return Err(DiagsError::precondition(
                Stage::GapFilling,
                format!(
                    "values {:?} and distance {:?} must share one shape",
                    values.dim(),
                    distance.dim()
                ),
            ));
        }

        let passes = self.passes();
        log::info!(
            "Radial gap fill: {} passes, method {}, grid {:?}",
            passes.len(),
            self.params.method,
            values.dim()
        );

        let mut working = values.clone();
        for pass in &passes {
            self.run_pass(&mut working, distance, pass)?;
        }

        log::info!("Radial gap fill complete");
        Ok(working)
    }

    fn run_pass(
        &self,
        working: &mut Field2,
        distance: &Field2,
        pass: &AnnulusPass,
    ) -> DiagsResult<()> {
        log::debug!(
            "Interpolating within range {} and {}",
            pass.inner_dist,
            pass.outer_dist
        );

        working.zip_mut_with(distance, |v, &d| {
            if d <= pass.inner_dist {
                *v = f64::NAN;
            }
        });

        let mut points = Vec::new();
        let mut samples = Vec::new();
        let mut holes = Vec::new();
        for ((row, col), &v) in working.indexed_iter() {
            let xy = [col as f64, row as f64];
            if v.is_finite() {
                points.push(xy);
                samples.push(v);
            } else {
                holes.push((row, col));
            }
        }

        let interpolator = ScatteredInterpolator::build(&points, &samples, self.params.method)
            .map_err(|source| DiagsError::Interpolation {
                stage: Stage::GapFilling,
                location: pass.to_string(),
                source,
            })?;

        let queries: Vec<[f64; 2]> = holes
            .iter()
            .map(|&(row, col)| [col as f64, row as f64])
            .collect();
        let estimates = interpolator.interpolate_many(&queries);

        let mut unresolved = 0usize;
        for (&(row, col), &v) in holes.iter().zip(estimates.iter()) {
            if !v.is_finite() {
                unresolved += 1;
            }
            working[[row, col]] = v;
        }

        log::debug!(
            "{}: {} valid samples, {} cells estimated, {} outside hull",
            pass,
            points.len(),
            holes.len(),
            unresolved
        );
        Ok(())
    }
}

/// Fill a data void by successive radial interpolation
pub fn fill_void(
    values: &Field2,
    distance: &Field2,
    max_dist_m: f64,
    step_m: f64,
    method: InterpMethod,
) -> DiagsResult<Field2> {
    let filler = RadialGapFiller::new(RadialFillParams {
        max_dist: max_dist_m,
        step: step_m,
        method,
    })?;
    filler.fill(values, distance)
}
