use approx::assert_abs_diff_eq;
use geodiags::{
    great_circle_destination, great_circle_distance, radial_distance_grid, GeoPoint, GreatCircle,
    EARTH_RADIUS_M,
};
use ndarray::Array2;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sample_points() -> Vec<GeoPoint> {
    vec![
        GeoPoint::new(0.0, 0.0),
        GeoPoint::new(45.0, -120.0),
        GeoPoint::new(-33.9, 18.4),
        GeoPoint::new(89.5, 179.0),
        GeoPoint::new(-60.0, -179.5),
        GeoPoint::new(25.76, -80.19),
    ]
}

#[test]
fn test_distance_identity_and_symmetry() {
    init_logging();
    let points = sample_points();
    for &p in &points {
        assert_eq!(great_circle_distance(p, p, EARTH_RADIUS_M), 0.0);
        for &q in &points {
            let pq = great_circle_distance(p, q, EARTH_RADIUS_M);
            let qp = great_circle_distance(q, p, EARTH_RADIUS_M);
            assert_abs_diff_eq!(pq, qp, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_zero_distance_destination_is_origin() {
    for &p in &sample_points() {
        for bearing in [0.0, 37.5, 90.0, 180.0, 271.0, -45.0] {
            let q = great_circle_destination(p, 0.0, bearing, EARTH_RADIUS_M);
            assert_abs_diff_eq!(q.lat, p.lat, epsilon = 1e-9);
            assert_abs_diff_eq!(q.lon, p.lon, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_destination_distance_round_trip() {
    init_logging();
    let sphere = GreatCircle::earth();
    let half_circumference = std::f64::consts::PI * EARTH_RADIUS_M;

    for &p in &sample_points() {
        for bearing in [0.0, 60.0, 135.0, 200.0, 315.0] {
            for d in [1.0, 5_000.0, 250_000.0, 3_000_000.0, 0.9 * half_circumference] {
                let q = sphere.destination(p, d, bearing);
                let back = sphere.distance(p, q);
                assert_abs_diff_eq!(back, d, epsilon = 1e-3 * d.max(1.0));
            }
        }
    }
}

#[test]
fn test_distance_grid_builds_void_mask() {
    let center = GeoPoint::new(20.0, -60.0);
    let lat = Array2::from_shape_fn((11, 11), |(i, _)| 15.0 + i as f64);
    let lon = Array2::from_shape_fn((11, 11), |(_, j)| -65.0 + j as f64);

    let distance = radial_distance_grid(center, lat.view(), lon.view(), EARTH_RADIUS_M).unwrap();
    assert_eq!(distance.dim(), (11, 11));
    assert_eq!(distance[[5, 5]], 0.0);

    let inside = distance.iter().filter(|&&d| d <= 200_000.0).count();
    assert_eq!(inside, 9);
}
