use crate::grids::great_circle::GreatCircle;
use crate::interp::gapfill::fill_gaps;
use crate::types::{
    require_positive, CartesianField, DiagsError, DiagsResult, GeoPoint, InterpFailure, Stage,
};
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Polar projection grid about a geographic center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarGridSpec {
    /// Projection center
    pub center: GeoPoint,
    /// Maximum radial distance (meters)
    pub max_radius: f64,
    /// Radial interval (meters)
    pub drho: f64,
    /// Azimuthal interval (degrees)
    pub dphi: f64,
}

impl PolarGridSpec {
    pub fn new(center: GeoPoint, max_radius: f64, drho: f64, dphi: f64) -> DiagsResult<Self> {
        let spec = Self {
            center,
            max_radius,
            drho,
            dphi,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> DiagsResult<()> {
        require_positive(Stage::Resampling, "max_radius", self.max_radius)?;
        require_positive(Stage::Resampling, "drho", self.drho)?;
        require_positive(Stage::Resampling, "dphi", self.dphi)?;
        Ok(())
    }

    /// Azimuthal interval in radians
    pub fn dphi_rad(&self) -> f64 {
        self.dphi.to_radians()
    }

    pub fn n_radial(&self) -> usize {
        (self.max_radius / self.drho).ceil() as usize + 1
    }

    pub fn n_azimuthal(&self) -> usize {
        (2.0 * PI / self.dphi_rad()).ceil() as usize + 1
    }

    /// Output shape (n_radial, n_azimuthal)
    pub fn shape(&self) -> (usize, usize) {
        (self.n_radial(), self.n_azimuthal())
    }

    /// Lower edge of every radial bin: 0, drho, 2 drho, ...
    pub fn radial_edges(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.n_radial(), |i| i as f64 * self.drho)
    }

    /// Lower edge of every azimuthal bin: -pi, -pi + dphi, ... (radians)
    pub fn azimuth_edges(&self) -> Array1<f64> {
        let dphi = self.dphi_rad();
        Array1::from_shape_fn(self.n_azimuthal(), |j| -PI + j as f64 * dphi)
    }

    pub fn radial_index(&self, rho: f64) -> Option<usize> {
        bin_index(rho, 0.0, self.drho, self.n_radial())
    }

    pub fn azimuth_index(&self, phi: f64) -> Option<usize> {
        bin_index(phi, -PI, self.dphi_rad(), self.n_azimuthal())
    }
}

/// Direct bin lookup for bins [origin + k step, origin + (k+1) step)
///
/// The estimate from the division is corrected against the exact edge values
/// so ties always land in the upper bin. The last bin is closed at the top.
fn bin_index(value: f64, origin: f64, step: f64, n: usize) -> Option<usize> {
    if !value.is_finite() || n == 0 || value < origin {
        return None;
    }
    let edge = |k: usize| origin + k as f64 * step;

    let estimate = ((value - origin) / step).floor();
    let mut k = if estimate >= n as f64 { n } else { estimate as usize };

    while k > 0 && value < edge(k) {
        k -= 1;
    }
    while k < n && value >= edge(k + 1) {
        k += 1;
    }

    if k < n {
        Some(k)
    } else if value == edge(n) {
        Some(n - 1)
    } else {
        None
    }
}

/// Field resampled onto a polar grid
#[derive(Debug, Clone)]
pub struct PolarField {
    /// Bin values, shape (n_radial, n_azimuthal)
    pub values: Array2<f64>,
    /// Bins that received at least one sample before gap filling
    pub populated_bins: usize,
}

impl PolarField {
    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }
}

/// Resolved bin membership of every sample of one lat/lon grid
///
/// Reuse it to resample further variables defined on the same grid without
/// recomputing the geometry.
#[derive(Debug, Clone)]
pub struct PolarBinning {
    spec: PolarGridSpec,
    source_dim: (usize, usize),
    bins: Vec<Option<(usize, usize)>>,
}

impl PolarBinning {
    pub fn spec(&self) -> &PolarGridSpec {
        &self.spec
    }

    /// Number of samples that fall inside the polar grid
    pub fn binned_samples(&self) -> usize {
        self.bins.iter().filter(|b| b.is_some()).count()
    }

    /// Average a variable into the bins and close empty bins with the 1-D gap fill
    pub fn apply(&self, values: ArrayView2<f64>) -> DiagsResult<PolarField> {
        if values.dim() != self.source_dim {
            return Err(DiagsError::precondition(
                Stage::Resampling,
                format!(
                    "variable shape {:?} does not match the binned grid {:?}",
                    values.dim(),
                    self.source_dim
                ),
            ));
        }

        let (n_rho, n_phi) = self.spec.shape();
        let mut sums = vec![0.0f64; n_rho * n_phi];
        let mut counts = vec![0usize; n_rho * n_phi];

        // Azimuth-major flat index: the radius varies fastest
        for (&value, bin) in values.iter().zip(self.bins.iter()) {
            if let Some((i, j)) = *bin {
                if value.is_finite() {
                    let flat = j * n_rho + i;
                    sums[flat] += value;
                    counts[flat] += 1;
                }
            }
        }

        let mut flat: Vec<f64> = sums
            .iter()
            .zip(counts.iter())
            .map(|(&s, &c)| if c > 0 { s / c as f64 } else { f64::NAN })
            .collect();
        let populated_bins = counts.iter().filter(|&&c| c > 0).count();

        if populated_bins == 0 {
            return Err(DiagsError::Interpolation {
                stage: Stage::Resampling,
                location: format!(
                    "{}x{} polar grid about {}",
                    n_rho, n_phi, self.spec.center
                ),
                source: InterpFailure::EmptyGrid,
            });
        }

        let filled = fill_gaps(&mut flat);
        log::debug!(
            "Polar bins populated: {}/{}, gap-filled: {}",
            populated_bins,
            n_rho * n_phi,
            filled
        );

        let values = Array2::from_shape_fn((n_rho, n_phi), |(i, j)| flat[j * n_rho + i]);
        Ok(PolarField {
            values,
            populated_bins,
        })
    }
}

/// Cartesian-to-polar resampler about a fixed center
pub struct PolarResampler {
    spec: PolarGridSpec,
    sphere: GreatCircle,
}

impl PolarResampler {
    /// Create a resampler on the Earth mean-radius sphere
    pub fn new(spec: PolarGridSpec) -> DiagsResult<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            sphere: GreatCircle::earth(),
        })
    }

    /// Use a different sphere for the distance and bearing geometry
    pub fn with_sphere(mut self, sphere: GreatCircle) -> Self {
        self.sphere = sphere;
        self
    }

    pub fn spec(&self) -> &PolarGridSpec {
        &self.spec
    }

    /// Radial distance and local bearing of a sample relative to the center
    ///
    /// The bearing uses signed east-west and north-south great-circle
    /// distances, a local equirectangular approximation. The sign test is on
    /// raw longitude, so it is not corrected across the antimeridian.
    pub fn polar_coordinates(&self, lat: f64, lon: f64) -> (f64, f64) {
        let c = self.spec.center;
        let rho = self.sphere.distance(c, GeoPoint::new(lat, lon));

        let mut x = self.sphere.distance(c, GeoPoint::new(c.lat, lon));
        if lon < c.lon {
            x = -x;
        }
        let mut y = self.sphere.distance(c, GeoPoint::new(lat, c.lon));
        if lat < c.lat {
            y = -y;
        }

        (rho, y.atan2(x))
    }

    fn locate(&self, lat: f64, lon: f64) -> Option<(usize, usize)> {
        let (rho, phi) = self.polar_coordinates(lat, lon);
        Some((self.spec.radial_index(rho)?, self.spec.azimuth_index(phi)?))
    }

    /// Resolve the polar bin of every grid point
    pub fn bin(&self, lat: ArrayView2<f64>, lon: ArrayView2<f64>) -> DiagsResult<PolarBinning> {
        if lat.dim() != lon.dim() {
            return Err(DiagsError::precondition(
                Stage::Resampling,
                format!(
                    "latitude {:?} and longitude {:?} grids must share one shape",
                    lat.dim(),
                    lon.dim()
                ),
            ));
        }

        let coords: Vec<(f64, f64)> = lat.iter().copied().zip(lon.iter().copied()).collect();

        #[cfg(feature = "parallel")]
        let bins: Vec<Option<(usize, usize)>> = {
            use rayon::prelude::*;
            coords
                .par_iter()
                .map(|&(la, lo)| self.locate(la, lo))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let bins: Vec<Option<(usize, usize)>> = coords
            .iter()
            .map(|&(la, lo)| self.locate(la, lo))
            .collect();

        let binning = PolarBinning {
            spec: self.spec,
            source_dim: lat.dim(),
            bins,
        };
        log::debug!(
            "{} of {} samples fall inside the polar grid",
            binning.binned_samples(),
            coords.len()
        );
        Ok(binning)
    }

    /// Resample a Cartesian field onto the polar grid
    ///
    /// # Returns
    /// * Polar field of shape (n_radial, n_azimuthal) and the grid it was built on
    pub fn resample(&self, field: &CartesianField) -> DiagsResult<(PolarField, PolarGridSpec)> {
        let (n_rho, n_phi) = self.spec.shape();
        log::info!(
            "Resampling {:?} field to {}x{} polar grid about {}",
            field.dim(),
            n_rho,
            n_phi,
            self.spec.center
        );
        log::debug!("Polar grid: {:?}", self.spec);

        let binning = self.bin(field.lat.view(), field.lon.view())?;
        let polar = binning.apply(field.values.view())?;

        log::info!("Polar resampling completed");
        Ok((polar, self.spec))
    }
}

/// Resample a lat/lon gridded variable onto a polar grid about `center`
///
/// # Arguments
/// * `values`, `lat`, `lon` - Same-shape variable and coordinate grids (degrees)
/// * `center` - Projection center
/// * `max_radius_m`, `drho_m` - Radial extent and interval (meters)
/// * `dphi_deg` - Azimuthal interval (degrees)
pub fn resample_to_polar(
    values: ArrayView2<f64>,
    lat: ArrayView2<f64>,
    lon: ArrayView2<f64>,
    center: GeoPoint,
    max_radius_m: f64,
    drho_m: f64,
    dphi_deg: f64,
) -> DiagsResult<(PolarField, PolarGridSpec)> {
    let spec = PolarGridSpec::new(center, max_radius_m, drho_m, dphi_deg)?;
    let field = CartesianField::new(values.to_owned(), lat.to_owned(), lon.to_owned())?;
    PolarResampler::new(spec)?.resample(&field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn spec() -> PolarGridSpec {
        PolarGridSpec::new(GeoPoint::new(0.0, 0.0), 200_000.0, 50_000.0, 90.0).unwrap()
    }

    #[test]
    fn test_grid_shape() {
        let s = spec();
        assert_eq!(s.shape(), (5, 5));
        assert_eq!(s.radial_edges(), array![0.0, 50_000.0, 100_000.0, 150_000.0, 200_000.0]);
        let az = s.azimuth_edges();
        assert_relative_eq!(az[0], -PI);
        assert_relative_eq!(az[4], PI, epsilon = 1e-12);
    }

    #[test]
    fn test_non_positive_steps_rejected() {
        let c = GeoPoint::new(0.0, 0.0);
        assert!(PolarGridSpec::new(c, 0.0, 1.0, 1.0).is_err());
        assert!(PolarGridSpec::new(c, 1.0, -1.0, 1.0).is_err());
        assert!(PolarGridSpec::new(c, 1.0, 1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_bin_index_half_open() {
        // [0,1) [1,2) [2,3]
        assert_eq!(bin_index(0.0, 0.0, 1.0, 3), Some(0));
        assert_eq!(bin_index(0.999, 0.0, 1.0, 3), Some(0));
        assert_eq!(bin_index(1.0, 0.0, 1.0, 3), Some(1));
        assert_eq!(bin_index(2.5, 0.0, 1.0, 3), Some(2));
        assert_eq!(bin_index(3.0, 0.0, 1.0, 3), Some(2));
        assert_eq!(bin_index(3.0001, 0.0, 1.0, 3), None);
        assert_eq!(bin_index(-0.1, 0.0, 1.0, 3), None);
        assert_eq!(bin_index(f64::NAN, 0.0, 1.0, 3), None);
    }

    #[test]
    fn test_bin_index_matches_edges_for_inexact_steps() {
        let step = 0.1;
        for k in 0..50 {
            let edge = k as f64 * step;
            assert_eq!(bin_index(edge, 0.0, step, 60), Some(k));
        }
    }

    #[test]
    fn test_polar_coordinates_quadrants() {
        let resampler = PolarResampler::new(spec()).unwrap();
        let (_, east) = resampler.polar_coordinates(0.0, 1.0);
        let (_, north) = resampler.polar_coordinates(1.0, 0.0);
        let (_, west) = resampler.polar_coordinates(0.0, -1.0);
        let (_, south) = resampler.polar_coordinates(-1.0, 0.0);
        assert_relative_eq!(east, 0.0);
        assert_relative_eq!(north, PI / 2.0);
        assert_relative_eq!(west, PI);
        assert_relative_eq!(south, -PI / 2.0);
    }

    #[test]
    fn test_bin_means() {
        let resampler = PolarResampler::new(spec()).unwrap();
        // Two samples share the first radial bin of the east sector
        let lat = array![[0.0, 0.0], [0.0, 0.0]];
        let lon = array![[0.0, 0.1], [0.2, 1.0]];
        let values = array![[2.0, 4.0], [6.0, 10.0]];

        let binning = resampler.bin(lat.view(), lon.view()).unwrap();
        let polar = binning.apply(values.view()).unwrap();

        // (0,0) -> bin (0, 2); 0.1 and 0.2 deg east -> bin (0, 2); 1 deg east -> bin (2, 2)
        assert_relative_eq!(polar.values[[0, 2]], 4.0);
        assert_relative_eq!(polar.values[[2, 2]], 10.0);
        assert_eq!(polar.populated_bins, 2);
        assert!(polar.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_binning_reuse_requires_same_shape() {
        let resampler = PolarResampler::new(spec()).unwrap();
        let lat = Array2::<f64>::zeros((2, 3));
        let lon = Array2::<f64>::zeros((2, 3));
        let binning = resampler.bin(lat.view(), lon.view()).unwrap();
        assert!(binning.apply(Array2::<f64>::zeros((3, 2)).view()).is_err());
        assert!(binning.apply(Array2::<f64>::ones((2, 3)).view()).is_ok());
    }

    #[test]
    fn test_empty_grid_is_an_error() {
        let resampler = PolarResampler::new(spec()).unwrap();
        // 10 degrees away, far outside the 200 km grid
        let lat = array![[10.0]];
        let lon = array![[10.0]];
        let binning = resampler.bin(lat.view(), lon.view()).unwrap();
        let err = binning.apply(array![[1.0]].view()).unwrap_err();
        assert!(matches!(
            err,
            DiagsError::Interpolation {
                stage: Stage::Resampling,
                source: InterpFailure::EmptyGrid,
                ..
            }
        ));
    }
}
