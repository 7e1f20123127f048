//! Spectral and matrix transforms of 2-D fields

pub mod fft;
pub mod svd;

pub use fft::{forward_fft2d, inverse_fft2d};
pub use svd::{deconstruct, rebuild, reconstruct, SvdFactors};
