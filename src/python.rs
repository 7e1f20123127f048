//! Python bindings (`_core` extension module)

use crate::grids;
use crate::interp;
use crate::transforms;
use crate::types::{DiagsError, GeoPoint, InterpMethod, EARTH_RADIUS_M};
use num_complex::Complex;
use numpy::{PyReadonlyArray1, PyReadonlyArray2, PyReadonlyArray3, ToPyArray};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

impl From<DiagsError> for PyErr {
    fn from(err: DiagsError) -> PyErr {
        match err {
            DiagsError::Precondition { .. } => PyValueError::new_err(err.to_string()),
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

/// Great-circle distance in meters between two (lat, lon) points
#[pyfunction]
#[pyo3(signature = (lat1, lon1, lat2, lon2, radius = EARTH_RADIUS_M))]
fn great_circle_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64, radius: f64) -> f64 {
    grids::great_circle_distance(GeoPoint::new(lat1, lon1), GeoPoint::new(lat2, lon2), radius)
}

/// Destination (lat, lon) after travelling `distance` meters along `bearing` degrees
#[pyfunction]
#[pyo3(signature = (lat, lon, distance, bearing, radius = EARTH_RADIUS_M))]
fn great_circle_destination(
    lat: f64,
    lon: f64,
    distance: f64,
    bearing: f64,
    radius: f64,
) -> (f64, f64) {
    let p = grids::great_circle_destination(GeoPoint::new(lat, lon), distance, bearing, radius);
    (p.lat, p.lon)
}

#[pyfunction]
#[pyo3(signature = (center_lat, center_lon, lats, lons, radius = EARTH_RADIUS_M))]
fn radial_distance(
    py: Python,
    center_lat: f64,
    center_lon: f64,
    lats: PyReadonlyArray1<f64>,
    lons: PyReadonlyArray1<f64>,
    radius: f64,
) -> PyResult<PyObject> {
    let center = GeoPoint::new(center_lat, center_lon);
    let distances = grids::radial_distance(center, lats.as_array(), lons.as_array(), radius)?;
    Ok(distances.to_pyarray(py).into())
}

/// Bin a lat/lon field onto a polar grid about (center_lat, center_lon)
#[pyfunction]
#[allow(clippy::too_many_arguments)]
fn resample_to_polar(
    py: Python,
    values: PyReadonlyArray2<f64>,
    lat: PyReadonlyArray2<f64>,
    lon: PyReadonlyArray2<f64>,
    center_lat: f64,
    center_lon: f64,
    max_radius: f64,
    drho: f64,
    dphi: f64,
) -> PyResult<PyObject> {
    let (field, spec) = interp::resample_to_polar(
        values.as_array(),
        lat.as_array(),
        lon.as_array(),
        GeoPoint::new(center_lat, center_lon),
        max_radius,
        drho,
        dphi,
    )?;

    let result = PyDict::new(py);
    result.set_item("data", field.values.to_pyarray(py))?;
    result.set_item("radial_edges", spec.radial_edges().to_pyarray(py))?;
    result.set_item("azimuth_edges", spec.azimuth_edges().to_pyarray(py))?;
    result.set_item("n_radial", spec.n_radial())?;
    result.set_item("n_azimuthal", spec.n_azimuthal())?;
    result.set_item("populated_bins", field.populated_bins)?;
    Ok(result.into())
}

/// Rebuild a data void by successive radial interpolation
#[pyfunction]
#[pyo3(signature = (values, distance, max_dist, step, method = "linear"))]
fn fill_void(
    py: Python,
    values: PyReadonlyArray2<f64>,
    distance: PyReadonlyArray2<f64>,
    max_dist: f64,
    step: f64,
    method: &str,
) -> PyResult<PyObject> {
    let method: InterpMethod = method.parse()?;
    let filled = interp::fill_void(
        &values.as_array().to_owned(),
        &distance.as_array().to_owned(),
        max_dist,
        step,
        method,
    )?;
    Ok(filled.to_pyarray(py).into())
}

#[pyfunction]
fn interp_vertical(
    py: Python,
    values: PyReadonlyArray3<f64>,
    coord: PyReadonlyArray3<f64>,
    levels: Vec<f64>,
) -> PyResult<PyObject> {
    let out = interp::interp_levels(values.as_array(), coord.as_array(), &levels)?;
    Ok(out.to_pyarray(py).into())
}

#[pyfunction]
fn forward_fft2d(py: Python, values: PyReadonlyArray2<f64>) -> PyResult<PyObject> {
    let spectrum = transforms::forward_fft2d(values.as_array())?;
    Ok(spectrum.to_pyarray(py).into())
}

#[pyfunction]
fn inverse_fft2d(py: Python, spectrum: PyReadonlyArray2<Complex<f64>>) -> PyResult<PyObject> {
    let data = transforms::inverse_fft2d(spectrum.as_array())?;
    Ok(data.to_pyarray(py).into())
}

/// Zero the leading `ncoeffs` singular values and rebuild the field
#[pyfunction]
fn svd_rebuild(py: Python, values: PyReadonlyArray2<f64>, ncoeffs: usize) -> PyResult<PyObject> {
    let out = transforms::rebuild(values.as_array(), ncoeffs)?;
    Ok(out.to_pyarray(py).into())
}

#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    // Geometry
    m.add_function(wrap_pyfunction!(great_circle_distance, m)?)?;
    m.add_function(wrap_pyfunction!(great_circle_destination, m)?)?;
    m.add_function(wrap_pyfunction!(radial_distance, m)?)?;

    // Interpolation
    m.add_function(wrap_pyfunction!(resample_to_polar, m)?)?;
    m.add_function(wrap_pyfunction!(fill_void, m)?)?;
    m.add_function(wrap_pyfunction!(interp_vertical, m)?)?;

    // Transforms
    m.add_function(wrap_pyfunction!(forward_fft2d, m)?)?;
    m.add_function(wrap_pyfunction!(inverse_fft2d, m)?)?;
    m.add_function(wrap_pyfunction!(svd_rebuild, m)?)?;

    m.add("EARTH_RADIUS_M", EARTH_RADIUS_M)?;
    Ok(())
}
