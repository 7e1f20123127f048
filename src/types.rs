use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Earth mean radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// 2D real-valued model field (rows x columns)
pub type Field2 = Array2<f64>;

/// Geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,  // degrees, [-90, 90]
    pub lon: f64,  // degrees, [-180, 180]
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lon)
    }
}

/// Scattered-data interpolation scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpMethod {
    /// Value of the closest valid sample
    Nearest,
    /// Barycentric interpolation on the Delaunay triangulation
    Linear,
    /// Clough-Tocher C1 cubic on the Delaunay triangulation
    Cubic,
}

impl InterpMethod {
    /// Minimum number of distinct samples the scheme needs
    pub fn min_points(&self) -> usize {
        match self {
            InterpMethod::Nearest => 1,
            InterpMethod::Linear | InterpMethod::Cubic => 3,
        }
    }
}

impl Default for InterpMethod {
    fn default() -> Self {
        InterpMethod::Linear
    }
}

impl fmt::Display for InterpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpMethod::Nearest => write!(f, "nearest"),
            InterpMethod::Linear => write!(f, "linear"),
            InterpMethod::Cubic => write!(f, "cubic"),
        }
    }
}

impl FromStr for InterpMethod {
    type Err = DiagsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(InterpMethod::Nearest),
            "linear" => Ok(InterpMethod::Linear),
            "cubic" => Ok(InterpMethod::Cubic),
            _ => Err(DiagsError::Precondition {
                stage: Stage::ScatteredInterpolation,
                message: format!(
                    "Unknown interpolation method '{}'; expected nearest, linear or cubic",
                    s
                ),
            }),
        }
    }
}

/// Per-call configuration; there is no process-wide constants object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagsConfig {
    /// Sphere radius used for all great-circle geometry (meters)
    pub earth_radius_m: f64,
    /// Scheme used by void filling when the caller does not pick one
    pub default_method: InterpMethod,
}

impl Default for DiagsConfig {
    fn default() -> Self {
        Self {
            earth_radius_m: EARTH_RADIUS_M,
            default_method: InterpMethod::Linear,
        }
    }
}

/// Processing stage reported with errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resampling,
    GapFilling,
    ScatteredInterpolation,
    VerticalInterpolation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Resampling => write!(f, "polar resampling"),
            Stage::GapFilling => write!(f, "radial gap filling"),
            Stage::ScatteredInterpolation => write!(f, "scattered interpolation"),
            Stage::VerticalInterpolation => write!(f, "vertical interpolation"),
        }
    }
}

/// Why an interpolation could not produce values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpFailure {
    #[error("{method} interpolation needs at least {required} valid points, found {found}")]
    TooFewPoints {
        method: InterpMethod,
        required: usize,
        found: usize,
    },

    #[error("valid points are collinear; {method} interpolation is undefined")]
    Degenerate { method: InterpMethod },

    #[error("no bin of the output grid received a sample")]
    EmptyGrid,
}

/// Error types for diagnostics processing
#[derive(Debug, thiserror::Error)]
pub enum DiagsError {
    #[error("Invalid input for {stage}: {message}")]
    Precondition { stage: Stage, message: String },

    #[error("Interpolation failed during {stage} at {location}: {source}")]
    Interpolation {
        stage: Stage,
        location: String,
        #[source]
        source: InterpFailure,
    },

    #[error("Transform error: {0}")]
    Transform(String),
}

impl DiagsError {
    pub(crate) fn precondition(stage: Stage, message: impl Into<String>) -> Self {
        DiagsError::Precondition {
            stage,
            message: message.into(),
        }
    }
}

/// Result type for diagnostics operations
pub type DiagsResult<T> = Result<T, DiagsError>;

/// Check that a step or extent is a finite, strictly positive number
pub(crate) fn require_positive(stage: Stage, name: &str, value: f64) -> DiagsResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DiagsError::precondition(
            stage,
            format!("{} must be finite and > 0, received {}", name, value),
        ))
    }
}

/// Cartesian (lat/lon gridded) field with matching coordinate arrays
#[derive(Debug, Clone)]
pub struct CartesianField {
    pub values: Field2,
    pub lat: Field2,
    pub lon: Field2,
}

impl CartesianField {
    /// Bundle a field with its coordinates, checking shapes and coordinate ranges
    pub fn new(values: Field2, lat: Field2, lon: Field2) -> DiagsResult<Self> {
        if values.dim() != lat.dim() || values.dim() != lon.dim() {
            return Err(DiagsError::precondition(
                Stage::Resampling,
                format!(
                    "values {:?}, latitude {:?} and longitude {:?} must share one shape",
                    values.dim(),
                    lat.dim(),
                    lon.dim()
                ),
            ));
        }
        if let Some(bad) = lat.iter().find(|v| v.is_finite() && v.abs() > 90.0) {
            return Err(DiagsError::precondition(
                Stage::Resampling,
                format!("latitude {} is outside [-90, 90]", bad),
            ));
        }
        if let Some(bad) = lon.iter().find(|v| v.is_finite() && v.abs() > 180.0) {
            return Err(DiagsError::precondition(
                Stage::Resampling,
                format!("longitude {} is outside [-180, 180]", bad),
            ));
        }
        Ok(Self { values, lat, lon })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }
}
