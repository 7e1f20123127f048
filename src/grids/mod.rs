//! Spherical geometry on geographic grids

pub mod great_circle;
pub mod radial_distance;

pub use great_circle::{great_circle_destination, great_circle_distance, GreatCircle};
pub use radial_distance::{radial_distance, radial_distance_grid};
