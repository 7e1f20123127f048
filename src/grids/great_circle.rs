use crate::types::{DiagsConfig, GeoPoint, EARTH_RADIUS_M};

/// Great-circle geometry on a sphere of fixed radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GreatCircle {
    /// Sphere radius in meters
    pub radius: f64,
}

impl Default for GreatCircle {
    fn default() -> Self {
        Self::earth()
    }
}

impl GreatCircle {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    /// Sphere with the Earth mean radius
    pub fn earth() -> Self {
        Self::new(EARTH_RADIUS_M)
    }

    pub fn from_config(config: &DiagsConfig) -> Self {
        Self::new(config.earth_radius_m)
    }

    /// Haversine distance between two locations (meters)
    pub fn distance(&self, p1: GeoPoint, p2: GeoPoint) -> f64 {
        great_circle_distance(p1, p2, self.radius)
    }

    /// Location reached from `origin` after `distance` meters along `bearing_deg`
    pub fn destination(&self, origin: GeoPoint, distance: f64, bearing_deg: f64) -> GeoPoint {
        great_circle_destination(origin, distance, bearing_deg, self.radius)
    }
}

/// Haversine (great-circle) distance between two locations
///
/// # Arguments
/// * `p1`, `p2` - Locations in degrees
/// * `radius` - Sphere radius in meters
///
/// # Returns
/// * Distance in meters; NaN coordinates propagate to a NaN distance
pub fn great_circle_distance(p1: GeoPoint, p2: GeoPoint, radius: f64) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (p2.lon - p1.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points; NaN passes through
    let h = if h > 1.0 { 1.0 } else { h };
    2.0 * radius * h.sqrt().asin()
}

/// Direct geodesic on a sphere: destination from origin, distance and bearing
///
/// # Arguments
/// * `origin` - Start location in degrees
/// * `distance` - Distance to travel in meters
/// * `bearing_deg` - Initial heading, degrees clockwise from north
/// * `radius` - Sphere radius in meters
pub fn great_circle_destination(
    origin: GeoPoint,
    distance: f64,
    bearing_deg: f64,
    radius: f64,
) -> GeoPoint {
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();
    let heading = bearing_deg.to_radians();
    let delta = distance / radius;

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * heading.cos()).asin();
    let lon2 = lon1
        + (heading.sin() * delta.sin() * lat1.cos())
            .atan2(delta.cos() - lat1.sin() * lat2.sin());

    GeoPoint::new(lat2.to_degrees(), lon2.to_degrees())
}
