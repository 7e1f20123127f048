use crate::grids::great_circle::great_circle_distance;
use crate::types::{DiagsError, DiagsResult, GeoPoint, Stage};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Zip};

/// Great-circle distance from a reference location to every point of a
/// 1-D coordinate list
///
/// # Arguments
/// * `center` - Reference location in degrees
/// * `lats`, `lons` - Coordinate arrays of equal length (degrees)
/// * `radius` - Sphere radius in meters
///
/// # Returns
/// * Distances in meters, one per input point
pub fn radial_distance(
    center: GeoPoint,
    lats: ArrayView1<f64>,
    lons: ArrayView1<f64>,
    radius: f64,
) -> DiagsResult<Array1<f64>> {
    if lats.len() != lons.len() {
        return Err(DiagsError::precondition(
            Stage::GapFilling,
            format!(
                "latitude ({}) and longitude ({}) arrays must have the same length",
                lats.len(),
                lons.len()
            ),
        ));
    }

    let mut distances = Array1::<f64>::zeros(lats.len());
    let zip = Zip::from(&mut distances).and(&lats).and(&lons);

    #[cfg(feature = "parallel")]
    zip.par_for_each(|d, &lat, &lon| {
        *d = great_circle_distance(center, GeoPoint::new(lat, lon), radius);
    });

    #[cfg(not(feature = "parallel"))]
    zip.for_each(|d, &lat, &lon| {
        *d = great_circle_distance(center, GeoPoint::new(lat, lon), radius);
    });

    Ok(distances)
}

/// 2-D distance field for gridded coordinates, shaped like the inputs
pub fn radial_distance_grid(
    center: GeoPoint,
    lat: ArrayView2<f64>,
    lon: ArrayView2<f64>,
    radius: f64,
) -> DiagsResult<Array2<f64>> {
    if lat.dim() != lon.dim() {
        return Err(DiagsError::precondition(
            Stage::GapFilling,
            format!(
                "latitude {:?} and longitude {:?} grids must share one shape",
                lat.dim(),
                lon.dim()
            ),
        ));
    }

    let lats: Array1<f64> = lat.iter().copied().collect();
    let lons: Array1<f64> = lon.iter().copied().collect();
    let flat = radial_distance(center, lats.view(), lons.view(), radius)?;

    flat.into_shape(lat.dim()).map_err(|e| {
        DiagsError::precondition(Stage::GapFilling, format!("Failed to reshape distances: {}", e))
    })
}
