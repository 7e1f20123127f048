//! Interpolation engines: 1-D gap filling, polar resampling, scattered
//! interpolation, radial void filling and vertical level interpolation

pub mod delaunay;
pub mod gapfill;
pub mod polar;
pub mod radial;
pub mod scattered;
pub mod vertical;

pub use gapfill::{fill_gaps, gap_filled};
pub use polar::{resample_to_polar, PolarBinning, PolarField, PolarGridSpec, PolarResampler};
pub use radial::{annulus_passes, fill_void, AnnulusPass, RadialFillParams, RadialGapFiller};
pub use scattered::ScatteredInterpolator;
pub use vertical::{interp_column, interp_levels};
