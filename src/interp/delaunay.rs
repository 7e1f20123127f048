//! Incremental (Bowyer-Watson) Delaunay triangulation of planar points
//!
//! Points are inserted one at a time into an enclosing super-triangle. The
//! cavity of each insertion is trimmed until it is star-shaped from the new
//! point, so rounding in the in-circle test can never produce overlapping
//! triangles. Queries use a uniform bucket grid over the triangles.

use std::collections::{HashMap, HashSet};

/// Outcome of inserting one point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Insertion {
    Placed,
    Duplicate,
    Failed,
}

const NONE: usize = usize::MAX;

/// Barycentric tolerance for points on triangle edges
const EDGE_TOLERANCE: f64 = 1e-10;

#[inline]
fn orient(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Positive when `d` lies strictly inside the circumcircle of CCW triangle (a, b, c)
#[inline]
fn in_circle(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> f64 {
    let (adx, ady) = (a[0] - d[0], a[1] - d[1]);
    let (bdx, bdy) = (b[0] - d[0], b[1] - d[1]);
    let (cdx, cdy) = (c[0] - d[0], c[1] - d[1]);

    let ad = adx * adx + ady * ady;
    let bd = bdx * bdx + bdy * bdy;
    let cd = cdx * cdx + cdy * cdy;

    ad * (bdx * cdy - cdx * bdy) - bd * (adx * cdy - cdx * ady) + cd * (adx * bdy - bdx * ady)
}

#[derive(Debug, Clone, Copy)]
struct Tri {
    /// Vertices in counter-clockwise order
    v: [usize; 3],
    /// Neighbour across the edge opposite v[i]
    n: [usize; 3],
}

struct Builder {
    pts: Vec<[f64; 2]>,
    tris: Vec<Tri>,
    mark: Vec<u32>,
    stamp: u32,
    last: usize,
}

impl Builder {
    fn new(points: &[[f64; 2]], min: [f64; 2], max: [f64; 2]) -> Self {
        let dmax = (max[0] - min[0]).max(max[1] - min[1]);
        let cx = 0.5 * (min[0] + max[0]);
        let cy = 0.5 * (min[1] + max[1]);

        let mut pts = points.to_vec();
        let s0 = pts.len();
        pts.push([cx - 20.0 * dmax, cy - dmax]);
        pts.push([cx + 20.0 * dmax, cy - dmax]);
        pts.push([cx, cy + 20.0 * dmax]);

        Self {
            pts,
            tris: vec![Tri {
                v: [s0, s0 + 1, s0 + 2],
                n: [NONE; 3],
            }],
            mark: vec![0],
            stamp: 0,
            last: 0,
        }
    }

    fn edge(&self, t: usize, e: usize) -> ([f64; 2], [f64; 2]) {
        let v = self.tris[t].v;
        (self.pts[v[(e + 1) % 3]], self.pts[v[(e + 2) % 3]])
    }

    fn contains(&self, t: usize, p: [f64; 2]) -> bool {
        (0..3).all(|e| {
            let (a, b) = self.edge(t, e);
            orient(a, b, p) >= 0.0
        })
    }

    /// Visibility walk from the most recent triangle
    fn locate(&self, p: [f64; 2]) -> Option<usize> {
        let mut t = self.last;
        let limit = 4 * self.tris.len() + 16;

        for step in 0..limit {
            let tri = self.tris[t];
            let mut moved = false;
            for k in 0..3 {
                // Rotating the first edge tested keeps the walk from cycling
                let e = (k + step) % 3;
                let (a, b) = self.edge(t, e);
                if orient(a, b, p) < 0.0 {
                    if tri.n[e] == NONE {
                        return None;
                    }
                    t = tri.n[e];
                    moved = true;
                    break;
                }
            }
            if !moved {
                return Some(t);
            }
        }

        (0..self.tris.len()).find(|&t| self.contains(t, p))
    }

    fn circumcircle_contains(&self, t: usize, p: [f64; 2]) -> bool {
        let v = self.tris[t].v;
        in_circle(self.pts[v[0]], self.pts[v[1]], self.pts[v[2]], p) > 0.0
    }

    /// Restrict the marked cavity to the triangles reachable from `t0`
    fn reachable_cavity(&mut self, t0: usize, old: &[usize]) -> Vec<usize> {
        let stamp = self.stamp;
        let mut seen: Vec<usize> = vec![t0];
        let mut stack = vec![t0];
        let mut visited: HashSet<usize> = HashSet::new();
        visited.insert(t0);

        while let Some(t) = stack.pop() {
            for &nb in &self.tris[t].n {
                if nb != NONE && self.mark[nb] == stamp && visited.insert(nb) {
                    seen.push(nb);
                    stack.push(nb);
                }
            }
        }
        for &t in old {
            if !visited.contains(&t) {
                self.mark[t] = 0;
            }
        }
        seen
    }

    fn insert(&mut self, pi: usize) -> Insertion {
        let p = self.pts[pi];
        let t0 = match self.locate(p) {
            Some(t) => t,
            None => return Insertion::Failed,
        };
        if self.tris[t0].v.iter().any(|&v| self.pts[v] == p) {
            return Insertion::Duplicate;
        }

        self.stamp += 1;
        let stamp = self.stamp;

        // Grow the conflict region
        self.mark[t0] = stamp;
        let mut cavity = vec![t0];
        let mut stack = vec![t0];
        while let Some(t) = stack.pop() {
            for e in 0..3 {
                let nb = self.tris[t].n[e];
                if nb != NONE && self.mark[nb] != stamp && self.circumcircle_contains(nb, p) {
                    self.mark[nb] = stamp;
                    cavity.push(nb);
                    stack.push(nb);
                }
            }
        }

        // Trim until every boundary edge sees p on its inner side
        let max_repairs = 4 * cavity.len() + 16;
        let mut repairs = 0;
        loop {
            let mut offender: Option<(usize, bool)> = None;
            'scan: for &t in &cavity {
                for e in 0..3 {
                    let nb = self.tris[t].n[e];
                    if nb != NONE && self.mark[nb] == stamp {
                        continue;
                    }
                    let (a, b) = self.edge(t, e);
                    if orient(a, b, p) <= 0.0 {
                        if t != t0 {
                            offender = Some((t, false));
                        } else if nb != NONE {
                            // p sits on this edge of its own triangle
                            offender = Some((nb, true));
                        } else {
                            return Insertion::Failed;
                        }
                        break 'scan;
                    }
                }
            }

            match offender {
                None => break,
                Some((t, add)) => {
                    repairs += 1;
                    if repairs > max_repairs {
                        log::debug!("Skipping point {} after failed cavity repair", pi);
                        for &c in &cavity {
                            self.mark[c] = 0;
                        }
                        return Insertion::Failed;
                    }
                    if add {
                        self.mark[t] = stamp;
                        cavity.push(t);
                    } else {
                        self.mark[t] = 0;
                        let old = std::mem::take(&mut cavity);
                        cavity = self.reachable_cavity(t0, &old);
                    }
                }
            }
        }

        // Boundary edges (a, b) with the triangle outside them
        let mut boundary: Vec<(usize, usize, usize)> = Vec::new();
        for &t in &cavity {
            for e in 0..3 {
                let nb = self.tris[t].n[e];
                if nb == NONE || self.mark[nb] != stamp {
                    let v = self.tris[t].v;
                    boundary.push((v[(e + 1) % 3], v[(e + 2) % 3], nb));
                }
            }
        }

        // A star-shaped cavity is a disk: one boundary loop, m + 2 edges
        let distinct_starts: HashSet<usize> = boundary.iter().map(|&(a, _, _)| a).collect();
        if boundary.len() != cavity.len() + 2 || distinct_starts.len() != boundary.len() {
            log::debug!("Skipping point {}: cavity is not a disk", pi);
            for &c in &cavity {
                self.mark[c] = 0;
            }
            return Insertion::Failed;
        }

        // Fan the cavity boundary to p, reusing the cavity slots first
        let mut slots = Vec::with_capacity(boundary.len());
        for k in 0..boundary.len() {
            if k < cavity.len() {
                slots.push(cavity[k]);
            } else {
                self.tris.push(Tri {
                    v: [NONE; 3],
                    n: [NONE; 3],
                });
                self.mark.push(0);
                slots.push(self.tris.len() - 1);
            }
        }

        let mut starts: HashMap<usize, usize> = HashMap::with_capacity(boundary.len());
        let mut ends: HashMap<usize, usize> = HashMap::with_capacity(boundary.len());
        for (k, &(a, b, outer)) in boundary.iter().enumerate() {
            let s = slots[k];
            self.tris[s] = Tri {
                v: [a, b, pi],
                n: [NONE, NONE, outer],
            };
            starts.insert(a, s);
            ends.insert(b, s);
            if outer != NONE {
                let ov = self.tris[outer].v;
                for f in 0..3 {
                    if ov[(f + 1) % 3] == b && ov[(f + 2) % 3] == a {
                        self.tris[outer].n[f] = s;
                    }
                }
            }
        }
        for (k, &(a, b, _)) in boundary.iter().enumerate() {
            let s = slots[k];
            self.tris[s].n[0] = starts.get(&b).copied().unwrap_or(NONE);
            self.tris[s].n[1] = ends.get(&a).copied().unwrap_or(NONE);
        }

        self.last = slots[0];
        Insertion::Placed
    }
}

/// Add triangles outside the current mesh until its boundary is convex
///
/// The finite super-triangle can cut away thin triangles along the convex
/// hull. Every boundary vertex where the boundary turns right (the mesh lies
/// to the left of its directed boundary edges) opens an ear `(a, c, b)`; ears
/// that contain no other boundary vertex are added until none remain.
fn close_hull(points: &[[f64; 2]], triangles: &mut Vec<[usize; 3]>) {
    let mut directed: HashSet<(usize, usize)> = HashSet::new();
    for t in triangles.iter() {
        for k in 0..3 {
            directed.insert((t[k], t[(k + 1) % 3]));
        }
    }
    let mut boundary: HashSet<(usize, usize)> = directed
        .iter()
        .copied()
        .filter(|&(a, b)| !directed.contains(&(b, a)))
        .collect();

    let mut added = 0usize;
    let limit = 2 * points.len() + 16;
    while added < limit {
        let mut outgoing: HashMap<usize, Vec<usize>> = HashMap::new();
        for &(a, b) in &boundary {
            outgoing.entry(a).or_default().push(b);
        }

        let ear = boundary.iter().copied().find_map(|(a, b)| {
            let c = match outgoing.get(&b).map(Vec::as_slice) {
                Some(&[c]) if c != a => c,
                _ => return None,
            };
            let (pa, pb, pc) = (points[a], points[b], points[c]);
            if orient(pa, pb, pc) >= 0.0 {
                return None;
            }
            let blocked = outgoing.keys().any(|&v| {
                v != a
                    && v != b
                    && v != c
                    && orient(pa, pc, points[v]) >= 0.0
                    && orient(pc, pb, points[v]) >= 0.0
                    && orient(pb, pa, points[v]) >= 0.0
            });
            if blocked {
                None
            } else {
                Some((a, b, c))
            }
        });

        let Some((a, b, c)) = ear else { break };
        triangles.push([a, c, b]);
        boundary.remove(&(a, b));
        boundary.remove(&(b, c));
        if !boundary.remove(&(c, a)) {
            boundary.insert((a, c));
        }
        added += 1;
    }

    if added > 0 {
        log::debug!("Closed the convex hull with {} boundary triangles", added);
    }
}

/// Uniform bucket grid mapping cells to the triangles overlapping them
#[derive(Debug)]
struct TriangleGrid {
    min: [f64; 2],
    cell: [f64; 2],
    nx: usize,
    ny: usize,
    buckets: Vec<Vec<usize>>,
}

impl TriangleGrid {
    fn new(points: &[[f64; 2]], triangles: &[[usize; 3]], min: [f64; 2], max: [f64; 2]) -> Self {
        let side = (triangles.len() as f64).sqrt().ceil().max(1.0) as usize;
        let (nx, ny) = (side, side);
        let cell = [
            ((max[0] - min[0]) / nx as f64).max(f64::MIN_POSITIVE),
            ((max[1] - min[1]) / ny as f64).max(f64::MIN_POSITIVE),
        ];
        let mut grid = Self {
            min,
            cell,
            nx,
            ny,
            buckets: vec![Vec::new(); nx * ny],
        };

        for (t, tri) in triangles.iter().enumerate() {
            let xs = tri.map(|v| points[v][0]);
            let ys = tri.map(|v| points[v][1]);
            let lo = [
                xs.iter().copied().fold(f64::INFINITY, f64::min),
                ys.iter().copied().fold(f64::INFINITY, f64::min),
            ];
            let hi = [
                xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                ys.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ];
            let (i0, j0) = grid.cell_of(lo);
            let (i1, j1) = grid.cell_of(hi);
            for j in j0..=j1 {
                for i in i0..=i1 {
                    grid.buckets[j * nx + i].push(t);
                }
            }
        }
        grid
    }

    fn cell_of(&self, p: [f64; 2]) -> (usize, usize) {
        let i = ((p[0] - self.min[0]) / self.cell[0]).floor();
        let j = ((p[1] - self.min[1]) / self.cell[1]).floor();
        let clamp = |v: f64, n: usize| {
            if v <= 0.0 {
                0
            } else if v >= (n - 1) as f64 {
                n - 1
            } else {
                v as usize
            }
        };
        (clamp(i, self.nx), clamp(j, self.ny))
    }
}

/// Delaunay triangulation of a planar point set
#[derive(Debug)]
pub struct Triangulation {
    points: Vec<[f64; 2]>,
    triangles: Vec<[usize; 3]>,
    min: [f64; 2],
    max: [f64; 2],
    grid: TriangleGrid,
}

impl Triangulation {
    /// Triangulate `points`; duplicates are ignored
    ///
    /// # Returns
    /// * `None` when the points span no area (fewer than three distinct,
    ///   non-collinear points)
    pub fn new(points: &[[f64; 2]]) -> Option<Self> {
        if points.len() < 3 || points.iter().any(|p| !p[0].is_finite() || !p[1].is_finite()) {
            return None;
        }

        let mut min = [f64::INFINITY; 2];
        let mut max = [f64::NEG_INFINITY; 2];
        for p in points {
            for k in 0..2 {
                min[k] = min[k].min(p[k]);
                max[k] = max[k].max(p[k]);
            }
        }
        if max[0] - min[0] <= 0.0 && max[1] - min[1] <= 0.0 {
            return None;
        }

        let mut builder = Builder::new(points, min, max);
        let mut duplicates = 0;
        let mut failed = 0;
        for pi in 0..points.len() {
            match builder.insert(pi) {
                Insertion::Placed => {}
                Insertion::Duplicate => duplicates += 1,
                Insertion::Failed => failed += 1,
            }
        }
        if duplicates > 0 {
            log::debug!("Triangulation ignored {} duplicate points", duplicates);
        }
        if failed > 0 {
            log::warn!(
                "Triangulation could not place {} of {} points; they do not contribute",
                failed,
                points.len()
            );
        }

        let n = points.len();
        let mut triangles: Vec<[usize; 3]> = builder
            .tris
            .iter()
            .filter(|t| t.v.iter().all(|&v| v < n))
            .map(|t| t.v)
            .filter(|v| orient(points[v[0]], points[v[1]], points[v[2]]) > 0.0)
            .collect();
        if triangles.is_empty() {
            return None;
        }
        close_hull(points, &mut triangles);

        let grid = TriangleGrid::new(points, &triangles, min, max);
        Some(Self {
            points: points.to_vec(),
            triangles,
            min,
            max,
            grid,
        })
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Barycentric coordinates of `q` in triangle `t`
    pub fn barycentric(&self, t: usize, q: [f64; 2]) -> [f64; 3] {
        let [a, b, c] = self.triangles[t].map(|v| self.points[v]);
        let area = orient(a, b, c);
        [
            orient(q, b, c) / area,
            orient(a, q, c) / area,
            orient(a, b, q) / area,
        ]
    }

    /// Triangle containing `q` and its barycentric coordinates, `None` outside the hull
    pub fn locate(&self, q: [f64; 2]) -> Option<(usize, [f64; 3])> {
        if !q[0].is_finite()
            || !q[1].is_finite()
            || q[0] < self.min[0]
            || q[0] > self.max[0]
            || q[1] < self.min[1]
            || q[1] > self.max[1]
        {
            return None;
        }

        let (i, j) = self.grid.cell_of(q);
        self.grid.buckets[j * self.grid.nx + i]
            .iter()
            .map(|&t| (t, self.barycentric(t, q)))
            .find(|(_, l)| l.iter().all(|&w| w >= -EDGE_TOLERANCE))
    }

    /// Distinct triangulation neighbours of every vertex
    pub fn vertex_neighbors(&self) -> Vec<Vec<usize>> {
        let mut rings: Vec<Vec<usize>> = vec![Vec::new(); self.points.len()];
        for tri in &self.triangles {
            for k in 0..3 {
                let v = tri[k];
                for &w in &[tri[(k + 1) % 3], tri[(k + 2) % 3]] {
                    if !rings[v].contains(&w) {
                        rings[v].push(w);
                    }
                }
            }
        }
        rings
    }
}
