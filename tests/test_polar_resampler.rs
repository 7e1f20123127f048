use approx::assert_abs_diff_eq;
use geodiags::{
    fill_gaps, resample_to_polar, CartesianField, DiagsError, GeoPoint, InterpFailure,
    PolarGridSpec, PolarResampler, Stage,
};
use ndarray::{array, Array2};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_four_samples_about_origin() {
    init_logging();
    let values = Array2::from_elem((2, 2), 1.0);
    let lat = array![[0.0, 0.0], [1.0, 1.0]];
    let lon = array![[0.0, 1.0], [0.0, 1.0]];

    let (field, spec) = resample_to_polar(
        values.view(),
        lat.view(),
        lon.view(),
        GeoPoint::new(0.0, 0.0),
        200_000.0,
        50_000.0,
        90.0,
    )
    .unwrap();

    assert_eq!(field.dim(), (5, 5));
    assert_eq!(spec.shape(), (5, 5));
    // The sample at the center lands in the innermost ring at phi = 0
    assert_eq!(field.values[[0, 2]], 1.0);
    assert!(field.populated_bins >= 3);
    assert!(field.values.iter().all(|v| *v == 1.0));
}

#[test]
fn test_output_shape_formula() {
    let values = Array2::from_elem((3, 3), 2.0);
    let lat = Array2::from_shape_fn((3, 3), |(i, _)| i as f64 * 0.5);
    let lon = Array2::from_shape_fn((3, 3), |(_, j)| j as f64 * 0.5);

    for &(max_radius, drho, dphi) in &[
        (200_000.0, 50_000.0, 90.0),
        (150_000.0, 40_000.0, 45.0),
        (100_000.0, 30_000.0, 7.0),
        (300_000.0, 300_000.0, 360.0),
    ] {
        let center = GeoPoint::new(0.5, 0.5);
        let (field, _) = resample_to_polar(
            values.view(),
            lat.view(),
            lon.view(),
            center,
            max_radius,
            drho,
            dphi,
        )
        .unwrap();
        let n_radial = (max_radius / drho).ceil() as usize + 1;
        let n_azimuthal = (2.0 * std::f64::consts::PI / dphi.to_radians()).ceil() as usize + 1;
        assert_eq!(field.dim(), (n_radial, n_azimuthal));
    }
}

#[test]
fn test_fully_populated_grid_needs_no_fill() {
    init_logging();
    // Dense ring of samples covering every bin of a coarse grid
    let spec = PolarGridSpec::new(GeoPoint::new(0.0, 0.0), 100_000.0, 100_000.0, 180.0).unwrap();
    let resampler = PolarResampler::new(spec).unwrap();

    let n = 41;
    let lat = Array2::from_shape_fn((n, n), |(i, _)| -0.9 + 1.8 * i as f64 / (n - 1) as f64);
    let lon = Array2::from_shape_fn((n, n), |(_, j)| -0.9 + 1.8 * j as f64 / (n - 1) as f64);
    let values = Array2::from_shape_fn((n, n), |(i, j)| (i + j) as f64);

    let field = CartesianField::new(values, lat, lon).unwrap();
    let (polar, _) = resampler.resample(&field).unwrap();

    assert_eq!(polar.populated_bins, polar.values.len());
    assert!(polar.values.iter().all(|v| v.is_finite()));

    let mut flat: Vec<f64> = polar.values.iter().copied().collect();
    let before = flat.clone();
    assert_eq!(fill_gaps(&mut flat), 0);
    assert_eq!(flat, before);
}

#[test]
fn test_caller_arrays_unchanged() {
    let values = array![[1.0, f64::NAN], [3.0, 4.0]];
    let lat = array![[0.0, 0.0], [0.5, 0.5]];
    let lon = array![[0.0, 0.5], [0.0, 0.5]];
    let snapshot = values.clone();

    let center = GeoPoint::new(0.0, 0.0);
    let _ = resample_to_polar(
        values.view(),
        lat.view(),
        lon.view(),
        center,
        100_000.0,
        25_000.0,
        30.0,
    )
    .unwrap();
    assert_eq!(values[[0, 0]], snapshot[[0, 0]]);
    assert!(values[[0, 1]].is_nan());
    assert_eq!(values[[1, 1]], snapshot[[1, 1]]);
}

#[test]
fn test_samples_beyond_radius_give_empty_grid_error() {
    let values = Array2::from_elem((2, 2), 1.0);
    let lat = array![[10.0, 10.0], [11.0, 11.0]];
    let lon = array![[10.0, 11.0], [10.0, 11.0]];

    let center = GeoPoint::new(0.0, 0.0);
    let err = resample_to_polar(
        values.view(),
        lat.view(),
        lon.view(),
        center,
        50_000.0,
        10_000.0,
        45.0,
    )
    .unwrap_err();
    match err {
        DiagsError::Interpolation { stage, source, .. } => {
            assert_eq!(stage, Stage::Resampling);
            assert_eq!(source, InterpFailure::EmptyGrid);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_gap_fill_scenario() {
    let mut v = [1.0, f64::NAN, f64::NAN, 4.0];
    fill_gaps(&mut v);
    for (a, b) in v.iter().zip([1.0, 2.0, 3.0, 4.0].iter()) {
        assert_abs_diff_eq!(*a, *b);
    }
}
