//! Terrain surface construction from scattered elevation samples.
//!
//! Two interchangeable strategies feed the contour extractor: a TIN built
//! with Bowyer-Watson Delaunay insertion and barycentric elevation lookup,
//! or a regular lattice resampled by inverse-distance weighting over the
//! sample convex hull with optional Gaussian smoothing.

use std::collections::BTreeSet;

use geo::{Area, ConvexHull, Intersects, MultiPoint, Polygon};
use kurbo::Point;

use crate::error::PlanError;
use crate::model::{SurfaceMode, TopographicSettings};
use crate::render::{Layer, Primitive, TextAlign};

/// One raw (x, y, z) input sample.
#[derive(Debug, Clone, Copy)]
pub struct ElevationSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// An evaluable elevation surface.
#[derive(Debug)]
pub enum Surface {
    Tin(TinSurface),
    Grid(GridSurface),
}

impl Surface {
    /// (zMin, zMax) over the input samples.
    pub fn z_range(&self) -> (f64, f64) {
        match self {
            Surface::Tin(tin) => tin.z_range,
            Surface::Grid(grid) => grid.z_range,
        }
    }

    /// Elevation at an arbitrary point; `None` outside the surface extent.
    pub fn elevation_at(&self, p: Point) -> Option<f64> {
        match self {
            Surface::Tin(tin) => tin.elevation_at(p),
            Surface::Grid(grid) => grid.elevation_at(p),
        }
    }

    /// Reference-mesh primitives: triangle edges for TIN, lattice lines
    /// with border and tick labels for grid.
    pub fn mesh_primitives(&self) -> Vec<Primitive> {
        match self {
            Surface::Tin(tin) => tin.mesh_primitives(),
            Surface::Grid(grid) => grid.mesh_primitives(),
        }
    }
}

/// Build the configured surface. Fewer than 3 samples or degenerate
/// (collinear) geometry is a ComputationError; the caller skips contouring
/// and keeps drawing everything else.
pub fn build_surface(
    samples: &[ElevationSample],
    settings: &TopographicSettings,
) -> Result<Surface, PlanError> {
    if samples.len() < 3 {
        return Err(PlanError::Computation(format!(
            "insufficient elevation samples: {} (need at least 3)",
            samples.len()
        )));
    }
    match settings.surface {
        SurfaceMode::Tin => TinSurface::build(samples).map(Surface::Tin),
        SurfaceMode::Grid => {
            GridSurface::build(samples, settings.grid_resolution, settings.smoothing)
                .map(Surface::Grid)
        }
    }
}

fn sample_z_range(samples: &[ElevationSample]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for s in samples {
        min = min.min(s.z);
        max = max.max(s.z);
    }
    (min, max)
}

// ── TIN mode ─────────────────────────────────────────────

/// Triangulated irregular network over the sample (x, y) positions.
#[derive(Debug)]
pub struct TinSurface {
    points: Vec<Point>,
    z: Vec<f64>,
    triangles: Vec<[usize; 3]>,
    z_range: (f64, f64),
}

impl TinSurface {
    pub fn build(samples: &[ElevationSample]) -> Result<Self, PlanError> {
        let points: Vec<Point> = samples.iter().map(|s| Point::new(s.x, s.y)).collect();
        let triangles = delaunay(&points);
        if triangles.is_empty() {
            return Err(PlanError::Computation(
                "degenerate triangulation: samples are collinear".to_string(),
            ));
        }
        Ok(Self {
            points,
            z: samples.iter().map(|s| s.z).collect(),
            triangles,
            z_range: sample_z_range(samples),
        })
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn vertex(&self, i: usize) -> (Point, f64) {
        (self.points[i], self.z[i])
    }

    /// Locate the containing triangle and interpolate its vertex
    /// elevations barycentrically. `None` outside the triangulation.
    pub fn elevation_at(&self, p: Point) -> Option<f64> {
        for t in &self.triangles {
            let (a, b, c) = (self.points[t[0]], self.points[t[1]], self.points[t[2]]);
            let denom = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
            if denom.abs() < 1e-12 {
                continue;
            }
            let w0 = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / denom;
            let w1 = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / denom;
            let w2 = 1.0 - w0 - w1;
            let eps = -1e-9;
            if w0 >= eps && w1 >= eps && w2 >= eps {
                return Some(w0 * self.z[t[0]] + w1 * self.z[t[1]] + w2 * self.z[t[2]]);
            }
        }
        None
    }

    fn mesh_primitives(&self) -> Vec<Primitive> {
        let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
        for t in &self.triangles {
            for (i, j) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                edges.insert((i.min(j), i.max(j)));
            }
        }
        edges
            .into_iter()
            .map(|(i, j)| Primitive::Polyline {
                layer: Layer::TinMesh,
                points: vec![self.points[i], self.points[j]],
                closed: false,
            })
            .collect()
    }
}

/// Bowyer-Watson incremental Delaunay triangulation.
///
/// Returns triangle vertex indices into `points`; empty when every
/// candidate triangle is degenerate (all points collinear).
fn delaunay(points: &[Point]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    // Super-triangle comfortably enclosing every sample.
    let mut min = points[0];
    let mut max = points[0];
    for p in points {
        min = Point::new(min.x.min(p.x), min.y.min(p.y));
        max = Point::new(max.x.max(p.x), max.y.max(p.y));
    }
    let span = (max.x - min.x).max(max.y - min.y).max(1.0);
    let mid = Point::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
    let mut verts: Vec<Point> = points.to_vec();
    verts.push(Point::new(mid.x - 20.0 * span, mid.y - 10.0 * span));
    verts.push(Point::new(mid.x + 20.0 * span, mid.y - 10.0 * span));
    verts.push(Point::new(mid.x, mid.y + 20.0 * span));

    let mut triangles: Vec<[usize; 3]> = vec![[n, n + 1, n + 2]];

    for i in 0..n {
        let p = verts[i];

        // Triangles whose circumcircle contains the new point.
        let mut bad: Vec<usize> = Vec::new();
        for (ti, t) in triangles.iter().enumerate() {
            if in_circumcircle(verts[t[0]], verts[t[1]], verts[t[2]], p) {
                bad.push(ti);
            }
        }

        // Boundary of the cavity: edges belonging to exactly one bad triangle.
        let mut boundary: Vec<(usize, usize)> = Vec::new();
        for &ti in &bad {
            let t = triangles[ti];
            for edge in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                let key = (edge.0.min(edge.1), edge.0.max(edge.1));
                if let Some(pos) = boundary
                    .iter()
                    .position(|e| (e.0.min(e.1), e.0.max(e.1)) == key)
                {
                    boundary.remove(pos);
                } else {
                    boundary.push(edge);
                }
            }
        }

        for &ti in bad.iter().rev() {
            triangles.remove(ti);
        }
        for (a, b) in boundary {
            triangles.push([a, b, i]);
        }
    }

    triangles
        .into_iter()
        .filter(|t| t.iter().all(|&v| v < n))
        .filter(|t| {
            // drop slivers with no area
            let (a, b, c) = (verts[t[0]], verts[t[1]], verts[t[2]]);
            ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs() > 1e-12
        })
        .collect()
}

/// Strict in-circle predicate, orientation-normalized.
fn in_circumcircle(a: Point, b: Point, c: Point, d: Point) -> bool {
    let (ax, ay) = (a.x - d.x, a.y - d.y);
    let (bx, by) = (b.x - d.x, b.y - d.y);
    let (cx, cy) = (c.x - d.x, c.y - d.y);
    let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
        - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);
    let orient = (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y);
    if orient >= 0.0 {
        det > 0.0
    } else {
        det < 0.0
    }
}

// ── Grid mode ────────────────────────────────────────────

/// Regular lattice of resampled elevations. Nodes outside the sample
/// convex hull hold NaN and are skipped by the contour tracer.
#[derive(Debug)]
pub struct GridSurface {
    pub origin: Point,
    pub dx: f64,
    pub dy: f64,
    pub nx: usize,
    pub ny: usize,
    /// Row-major node values, `values[row * nx + col]`.
    pub values: Vec<f64>,
    z_range: (f64, f64),
}

impl GridSurface {
    pub fn build(
        samples: &[ElevationSample],
        resolution: usize,
        smoothing: f64,
    ) -> Result<Self, PlanError> {
        let hull = convex_hull(samples)?;

        let (mut min_x, mut min_y, mut max_x, mut max_y) =
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for s in samples {
            min_x = min_x.min(s.x);
            min_y = min_y.min(s.y);
            max_x = max_x.max(s.x);
            max_y = max_y.max(s.y);
        }

        let nx = resolution.max(2);
        let ny = resolution.max(2);
        let dx = (max_x - min_x) / (nx - 1) as f64;
        let dy = (max_y - min_y) / (ny - 1) as f64;

        let mut values = vec![f64::NAN; nx * ny];
        for row in 0..ny {
            for col in 0..nx {
                let x = min_x + col as f64 * dx;
                let y = min_y + row as f64 * dy;
                if hull.intersects(&geo::Point::new(x, y)) {
                    values[row * nx + col] = idw(samples, x, y);
                }
            }
        }

        if smoothing > 0.0 {
            values = gaussian_smooth(&values, nx, ny, smoothing);
        }

        if values.iter().any(|v| !v.is_nan() && !v.is_finite()) {
            return Err(PlanError::Computation(
                "non-finite interpolation result on lattice".to_string(),
            ));
        }

        Ok(Self {
            origin: Point::new(min_x, min_y),
            dx,
            dy,
            nx,
            ny,
            values,
            z_range: sample_z_range(samples),
        })
    }

    pub fn node(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.nx + col]
    }

    pub fn node_point(&self, row: usize, col: usize) -> Point {
        Point::new(
            self.origin.x + col as f64 * self.dx,
            self.origin.y + row as f64 * self.dy,
        )
    }

    /// Bilinear lookup on the lattice; NaN cells propagate to `None`.
    pub fn elevation_at(&self, p: Point) -> Option<f64> {
        let fx = (p.x - self.origin.x) / self.dx;
        let fy = (p.y - self.origin.y) / self.dy;
        if fx < 0.0 || fy < 0.0 {
            return None;
        }
        let col = (fx.floor() as usize).min(self.nx - 2);
        let row = (fy.floor() as usize).min(self.ny - 2);
        if fx > (self.nx - 1) as f64 || fy > (self.ny - 1) as f64 {
            return None;
        }
        let tx = fx - col as f64;
        let ty = fy - row as f64;
        let v00 = self.node(row, col);
        let v10 = self.node(row, col + 1);
        let v01 = self.node(row + 1, col);
        let v11 = self.node(row + 1, col + 1);
        let v = v00 * (1.0 - tx) * (1.0 - ty)
            + v10 * tx * (1.0 - ty)
            + v01 * (1.0 - tx) * ty
            + v11 * tx * ty;
        if v.is_nan() {
            None
        } else {
            Some(v)
        }
    }

    /// Lattice lines, border rectangle, and easting/northing tick labels.
    fn mesh_primitives(&self) -> Vec<Primitive> {
        let mut prims = Vec::new();
        let step = (self.nx / 10).max(1);
        let top = self.node_point(self.ny - 1, 0).y;
        let right = self.node_point(0, self.nx - 1).x;

        for col in (0..self.nx).step_by(step) {
            let x = self.node_point(0, col).x;
            prims.push(Primitive::Polyline {
                layer: Layer::GridMesh,
                points: vec![Point::new(x, self.origin.y), Point::new(x, top)],
                closed: false,
            });
            prims.push(Primitive::Text {
                layer: Layer::GridMesh,
                content: format!("{:.0}E", x),
                position: Point::new(x, self.origin.y - self.dy),
                height: self.dy,
                rotation: 0.0,
                align: TextAlign::MiddleCenter,
            });
        }
        for row in (0..self.ny).step_by(step) {
            let y = self.node_point(row, 0).y;
            prims.push(Primitive::Polyline {
                layer: Layer::GridMesh,
                points: vec![Point::new(self.origin.x, y), Point::new(right, y)],
                closed: false,
            });
            prims.push(Primitive::Text {
                layer: Layer::GridMesh,
                content: format!("{:.0}N", y),
                position: Point::new(self.origin.x - self.dx, y),
                height: self.dy,
                rotation: 0.0,
                align: TextAlign::MiddleCenter,
            });
        }

        prims.push(Primitive::Polyline {
            layer: Layer::GridMesh,
            points: vec![
                Point::new(self.origin.x, self.origin.y),
                Point::new(right, self.origin.y),
                Point::new(right, top),
                Point::new(self.origin.x, top),
            ],
            closed: true,
        });
        prims
    }
}

fn convex_hull(samples: &[ElevationSample]) -> Result<Polygon<f64>, PlanError> {
    let pts: Vec<geo::Point<f64>> = samples
        .iter()
        .map(|s| geo::Point::new(s.x, s.y))
        .collect();
    let hull = MultiPoint::from(pts).convex_hull();
    if hull.unsigned_area() < 1e-12 {
        return Err(PlanError::Computation(
            "degenerate sample geometry: convex hull has no area".to_string(),
        ));
    }
    Ok(hull)
}

/// Inverse-distance-squared interpolation with exact-sample snap.
fn idw(samples: &[ElevationSample], x: f64, y: f64) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for s in samples {
        let d2 = (s.x - x) * (s.x - x) + (s.y - y) * (s.y - y);
        if d2 < 1e-18 {
            return s.z;
        }
        let w = 1.0 / d2;
        num += w * s.z;
        den += w;
    }
    num / den
}

/// Separable NaN-aware Gaussian blur over the lattice. NaN nodes stay NaN;
/// kernel weights over NaN neighbours are renormalized away.
fn gaussian_smooth(values: &[f64], nx: usize, ny: usize, sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).ceil() as isize;
    let kernel: Vec<f64> = (-radius..=radius)
        .map(|k| (-(k as f64 * k as f64) / (2.0 * sigma * sigma)).exp())
        .collect();

    let pass = |src: &[f64], horizontal: bool| -> Vec<f64> {
        let mut dst = vec![f64::NAN; src.len()];
        for row in 0..ny {
            for col in 0..nx {
                let center = src[row * nx + col];
                if center.is_nan() {
                    continue;
                }
                let mut num = 0.0;
                let mut den = 0.0;
                for (ki, w) in kernel.iter().enumerate() {
                    let offset = ki as isize - radius;
                    let (r, c) = if horizontal {
                        (row as isize, col as isize + offset)
                    } else {
                        (row as isize + offset, col as isize)
                    };
                    if r < 0 || c < 0 || r >= ny as isize || c >= nx as isize {
                        continue;
                    }
                    let v = src[r as usize * nx + c as usize];
                    if v.is_nan() {
                        continue;
                    }
                    num += w * v;
                    den += w;
                }
                dst[row * nx + col] = num / den;
            }
        }
        dst
    };

    pass(&pass(values, true), false)
}
