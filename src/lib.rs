//! geodiags: spatial interpolation and diagnostics for gridded geophysical fields
//!
//! Great-circle geometry, Cartesian-to-polar resampling about a geographic
//! center, successive radial void filling on top of scattered-data
//! interpolation, vertical level interpolation, and 2-D FFT/SVD transforms.

pub mod grids;
pub mod interp;
pub mod transforms;
pub mod types;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    CartesianField, DiagsConfig, DiagsError, DiagsResult, Field2, GeoPoint, InterpFailure,
    InterpMethod, Stage, EARTH_RADIUS_M,
};

pub use grids::{
    great_circle_destination, great_circle_distance, radial_distance, radial_distance_grid,
    GreatCircle,
};
pub use interp::{
    annulus_passes, fill_gaps, fill_void, gap_filled, interp_levels, resample_to_polar,
    AnnulusPass, PolarBinning, PolarField, PolarGridSpec, PolarResampler, RadialFillParams,
    RadialGapFiller, ScatteredInterpolator,
};
