use crate::interp::delaunay::Triangulation;
use crate::types::{DiagsError, DiagsResult, InterpFailure, InterpMethod, Stage};
use kiddo::{ImmutableKdTree, SquaredEuclidean};

#[derive(Debug)]
enum Scheme {
    Nearest(ImmutableKdTree<f64, 2>),
    Linear(Triangulation),
    Cubic {
        mesh: Triangulation,
        gradients: Vec<[f64; 2]>,
    },
}

/// Interpolator over irregularly spaced 2-D samples
///
/// `Nearest` is defined everywhere; `Linear` and `Cubic` are defined inside
/// the convex hull of the samples and return NaN outside it.
#[derive(Debug)]
pub struct ScatteredInterpolator {
    method: InterpMethod,
    values: Vec<f64>,
    scheme: Scheme,
}

impl ScatteredInterpolator {
    /// Build an interpolator from sample locations and finite values
    pub fn new(points: &[[f64; 2]], values: &[f64], method: InterpMethod) -> DiagsResult<Self> {
        if points.len() != values.len() {
            return Err(DiagsError::precondition(
                Stage::ScatteredInterpolation,
                format!(
                    "{} sample locations but {} sample values",
                    points.len(),
                    values.len()
                ),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DiagsError::precondition(
                Stage::ScatteredInterpolation,
                "sample values must be finite",
            ));
        }

        Self::build(points, values, method).map_err(|source| DiagsError::Interpolation {
            stage: Stage::ScatteredInterpolation,
            location: format!("{} samples", points.len()),
            source,
        })
    }

    pub(crate) fn build(
        points: &[[f64; 2]],
        values: &[f64],
        method: InterpMethod,
    ) -> Result<Self, InterpFailure> {
        if points.len() < method.min_points() {
            return Err(InterpFailure::TooFewPoints {
                method,
                required: method.min_points(),
                found: points.len(),
            });
        }

        let scheme = match method {
            InterpMethod::Nearest => Scheme::Nearest(ImmutableKdTree::new_from_slice(points)),
            InterpMethod::Linear => {
                let mesh = Triangulation::new(points).ok_or(InterpFailure::Degenerate { method })?;
                Scheme::Linear(mesh)
            }
            InterpMethod::Cubic => {
                let mesh = Triangulation::new(points).ok_or(InterpFailure::Degenerate { method })?;
                let gradients = estimate_gradients(&mesh, values);
                Scheme::Cubic { mesh, gradients }
            }
        };

        Ok(Self {
            method,
            values: values.to_vec(),
            scheme,
        })
    }

    pub fn method(&self) -> InterpMethod {
        self.method
    }

    /// Interpolated value at `q`
    pub fn interpolate(&self, q: [f64; 2]) -> f64 {
        match &self.scheme {
            Scheme::Nearest(tree) => {
                if !q[0].is_finite() || !q[1].is_finite() {
                    return f64::NAN;
                }
                let nearest = tree.nearest_one::<SquaredEuclidean>(&q);
                self.values[nearest.item as usize]
            }
            Scheme::Linear(mesh) => match mesh.locate(q) {
                Some((t, l)) => {
                    let tri = mesh.triangles()[t];
                    (0..3).map(|k| l[k] * self.values[tri[k]]).sum()
                }
                None => f64::NAN,
            },
            Scheme::Cubic { mesh, gradients } => match mesh.locate(q) {
                Some((t, l)) => {
                    let tri = mesh.triangles()[t];
                    clough_tocher(
                        tri.map(|v| mesh.points()[v]),
                        tri.map(|v| self.values[v]),
                        tri.map(|v| gradients[v]),
                        l,
                    )
                }
                None => f64::NAN,
            },
        }
    }

    /// Interpolated values at every query location
    pub fn interpolate_many(&self, queries: &[[f64; 2]]) -> Vec<f64> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            queries.par_iter().map(|&q| self.interpolate(q)).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            queries.iter().map(|&q| self.interpolate(q)).collect()
        }
    }
}

#[inline]
fn sub(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    [a[0] - b[0], a[1] - b[1]]
}

#[inline]
fn dot(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

#[inline]
fn cross(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

/// Vertex gradients by inverse-square-distance weighted least squares over
/// each vertex's triangulation neighbours
fn estimate_gradients(mesh: &Triangulation, values: &[f64]) -> Vec<[f64; 2]> {
    let points = mesh.points();
    mesh.vertex_neighbors()
        .iter()
        .enumerate()
        .map(|(v, ring)| {
            let (mut sxx, mut sxy, mut syy, mut sxf, mut syf) = (0.0, 0.0, 0.0, 0.0, 0.0);
            for &w in ring {
                let d = sub(points[w], points[v]);
                let df = values[w] - values[v];
                let weight = 1.0 / dot(d, d);
                sxx += weight * d[0] * d[0];
                sxy += weight * d[0] * d[1];
                syy += weight * d[1] * d[1];
                sxf += weight * d[0] * df;
                syf += weight * d[1] * df;
            }
            let det = sxx * syy - sxy * sxy;
            if ring.len() < 2 || det.abs() <= f64::EPSILON * (sxx * syy).abs() {
                [0.0, 0.0]
            } else {
                [(syy * sxf - sxy * syf) / det, (sxx * syf - sxy * sxf) / det]
            }
        })
        .collect()
}

/// Clough-Tocher cubic on a triangle split at its centroid
///
/// Each of the three sub-triangles carries a cubic Bezier patch. Vertex
/// ordinates come from the vertex values and gradients, the cross-boundary
/// derivative is linear along every outer edge, and the interior ordinates
/// satisfy the C1 conditions across the split.
fn clough_tocher(p: [[f64; 2]; 3], f: [f64; 3], g: [[f64; 2]; 3], l: [f64; 3]) -> f64 {
    let s = [
        (p[0][0] + p[1][0] + p[2][0]) / 3.0,
        (p[0][1] + p[1][1] + p[2][1]) / 3.0,
    ];

    // b[i][j]: ordinate on edge i->j next to vertex i
    let mut b = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            if i != j {
                b[i][j] = f[i] + dot(g[i], sub(p[j], p[i])) / 3.0;
            }
        }
    }

    // bs[i]: ordinate on the split edge i->S next to vertex i
    let mut bs = [0.0; 3];
    for i in 0..3 {
        let (j, k) = ((i + 1) % 3, (i + 2) % 3);
        bs[i] = (f[i] + b[i][j] + b[i][k]) / 3.0;
    }

    // t[i]: interior ordinate of sub-triangle (i, i+1, S)
    let mut t = [0.0; 3];
    for i in 0..3 {
        let j = (i + 1) % 3;
        let e = sub(p[j], p[i]);
        let sv = sub(s, p[i]);
        let n = [-e[1], e[0]];

        // Inward edge normal in barycentric form over (i, j, S)
        let det = cross(e, sv);
        let dj = cross(n, sv) / det;
        let ds = cross(e, n) / det;
        let di = -dj - ds;

        let c0 = di * f[i] + dj * b[i][j] + ds * bs[i];
        let c2 = di * b[j][i] + dj * f[j] + ds * bs[j];
        t[i] = (0.5 * (c0 + c2) - di * b[i][j] - dj * b[j][i]) / ds;
    }

    // q[i]: ordinate on the split edge i->S next to S
    let mut q = [0.0; 3];
    for i in 0..3 {
        q[i] = (bs[i] + t[i] + t[(i + 2) % 3]) / 3.0;
    }
    let fs = (q[0] + q[1] + q[2]) / 3.0;

    // Sub-triangle opposite the smallest barycentric weight
    let k = (0..3)
        .min_by(|&a, &c| l[a].total_cmp(&l[c]))
        .unwrap_or(0);
    let (i, j) = ((k + 1) % 3, (k + 2) % 3);
    let u = l[i] - l[k];
    let v = l[j] - l[k];
    let w = 3.0 * l[k];

    u * u * u * f[i]
        + v * v * v * f[j]
        + w * w * w * fs
        + 3.0
            * (u * u * v * b[i][j]
                + u * v * v * b[j][i]
                + u * u * w * bs[i]
                + u * w * w * q[i]
                + v * v * w * bs[j]
                + v * w * w * q[j])
        + 6.0 * u * v * w * t[i]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn lattice(nx: usize, ny: usize) -> Vec<[f64; 2]> {
        (0..ny)
            .flat_map(|j| (0..nx).map(move |i| [i as f64, j as f64]))
            .collect()
    }

    fn plane(p: [f64; 2]) -> f64 {
        2.0 + 0.5 * p[0] - 1.25 * p[1]
    }

    #[test]
    fn test_nearest_picks_closest_sample() {
        let points = vec![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]];
        let values = vec![1.0, 2.0, 3.0];
        let interp = ScatteredInterpolator::new(&points, &values, InterpMethod::Nearest).unwrap();
        assert_eq!(interp.interpolate([1.0, 1.0]), 1.0);
        assert_eq!(interp.interpolate([9.0, -3.0]), 2.0);
        assert_eq!(interp.interpolate([-5.0, 40.0]), 3.0);
    }

    #[test]
    fn test_linear_reproduces_plane() {
        let points = lattice(5, 5);
        let values: Vec<f64> = points.iter().map(|&p| plane(p)).collect();
        let interp = ScatteredInterpolator::new(&points, &values, InterpMethod::Linear).unwrap();

        for &q in &[[0.3, 0.7], [2.5, 2.5], [3.9, 0.1], [4.0, 4.0], [0.0, 2.2]] {
            assert_abs_diff_eq!(interp.interpolate(q), plane(q), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cubic_reproduces_plane() {
        let points = lattice(6, 5);
        let values: Vec<f64> = points.iter().map(|&p| plane(p)).collect();
        let interp = ScatteredInterpolator::new(&points, &values, InterpMethod::Cubic).unwrap();

        for &q in &[[0.3, 0.7], [2.5, 2.5], [4.9, 3.1], [1.0, 1.0], [5.0, 0.5]] {
            assert_abs_diff_eq!(interp.interpolate(q), plane(q), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_cubic_matches_samples_at_vertices() {
        let points = lattice(4, 4);
        let values: Vec<f64> = points.iter().map(|p| (p[0] * 0.7).sin() + p[1] * p[1]).collect();
        let interp = ScatteredInterpolator::new(&points, &values, InterpMethod::Cubic).unwrap();
        for (p, v) in points.iter().zip(values.iter()) {
            assert_abs_diff_eq!(interp.interpolate(*p), *v, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_nearest_on_large_lattice() {
        for n in [50, 100, 120] {
            let points = lattice(n, n);
            let values: Vec<f64> = points.iter().map(|p| p[0] + 1000.0 * p[1]).collect();
            let interp =
                ScatteredInterpolator::new(&points, &values, InterpMethod::Nearest).unwrap();
            assert_eq!(interp.interpolate([3.2, 7.9]), 3.0 + 8000.0);
            assert_eq!(interp.interpolate([(n - 1) as f64 + 5.0, -2.0]), (n - 1) as f64);
        }
    }

    #[test]
    fn test_linear_defined_on_hull_edges() {
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64 * 1000.0
        };
        let mut points: Vec<[f64; 2]> = (0..2000).map(|_| [next(), next()]).collect();
        points.extend([[0.0, 0.0], [1000.0, 0.0], [1000.0, 1000.0], [0.0, 1000.0]]);
        let values: Vec<f64> = points.iter().map(|&p| plane(p)).collect();

        let linear = ScatteredInterpolator::new(&points, &values, InterpMethod::Linear).unwrap();
        let cubic = ScatteredInterpolator::new(&points, &values, InterpMethod::Cubic).unwrap();
        for i in 0..=100 {
            for j in 0..=100 {
                let q = [10.0 * i as f64, 10.0 * j as f64];
                assert_abs_diff_eq!(linear.interpolate(q), plane(q), epsilon = 1e-6);
                assert!(cubic.interpolate(q).is_finite(), "cubic NaN at {:?}", q);
            }
        }
    }

    #[test]
    fn test_outside_hull_is_nan() {
        let points = lattice(3, 3);
        let values = vec![1.0; 9];
        let linear = ScatteredInterpolator::new(&points, &values, InterpMethod::Linear).unwrap();
        assert!(linear.interpolate([5.0, 5.0]).is_nan());
        let cubic = ScatteredInterpolator::new(&points, &values, InterpMethod::Cubic).unwrap();
        assert!(cubic.interpolate([-1.0, 0.5]).is_nan());
    }

    #[test]
    fn test_too_few_points() {
        let points = vec![[0.0, 0.0], [1.0, 0.0]];
        let values = vec![1.0, 2.0];
        let err = ScatteredInterpolator::new(&points, &values, InterpMethod::Linear).unwrap_err();
        assert!(matches!(
            err,
            DiagsError::Interpolation {
                source: InterpFailure::TooFewPoints { required: 3, found: 2, .. },
                ..
            }
        ));
        let empty = ScatteredInterpolator::new(&[], &[], InterpMethod::Nearest);
        assert!(empty.is_err());
    }

    #[test]
    fn test_collinear_points_degenerate() {
        let points = vec![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0]];
        let values = vec![0.0; 4];
        let err = ScatteredInterpolator::new(&points, &values, InterpMethod::Cubic).unwrap_err();
        assert!(err.to_string().contains("collinear"));
    }

    #[test]
    fn test_interpolate_many_matches_single() {
        let points = lattice(4, 4);
        let values: Vec<f64> = points.iter().map(|&p| plane(p)).collect();
        let interp = ScatteredInterpolator::new(&points, &values, InterpMethod::Linear).unwrap();
        let queries = vec![[0.5, 0.5], [1.5, 2.5], [10.0, 10.0]];
        let many = interp.interpolate_many(&queries);
        for (q, v) in queries.iter().zip(many.iter()) {
            let single = interp.interpolate(*q);
            assert!(single == *v || (single.is_nan() && v.is_nan()));
        }
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let points = lattice(2, 2);
        let values = vec![1.0, f64::NAN, 1.0, 1.0];
        let err = ScatteredInterpolator::new(&points, &values, InterpMethod::Nearest).unwrap_err();
        assert!(matches!(err, DiagsError::Precondition { .. }));
    }
}
