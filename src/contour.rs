//! Iso-elevation line extraction, classification and filtering.
//!
//! Levels are an arithmetic sequence snapped to the contour interval.
//! TIN surfaces are traced by walking triangle edges that straddle the
//! level; grid surfaces by marching squares over the lattice. Crossing
//! segments are chained into polylines, thinned by a minimum-distance
//! filter, and major lines get a label anchor.

use kurbo::Point;

use crate::model::TopographicSettings;
use crate::terrain::{GridSurface, Surface, TinSurface};

/// Matching tolerance when chaining crossing segments into polylines.
const CHAIN_EPSILON: f64 = 1e-3;

/// Tolerance for classifying a level as a multiple of the major interval.
const MAJOR_EPSILON: f64 = 1e-3;

/// One traced, filtered iso-elevation polyline.
#[derive(Debug, Clone)]
pub struct ContourSegment {
    pub level: f64,
    pub major: bool,
    pub points: Vec<Point>,
    /// Elevation label anchor; only for major lines with enough points.
    pub label_anchor: Option<Point>,
}

impl ContourSegment {
    /// Elevation text attached at the label anchor.
    pub fn label_text(&self) -> String {
        format!("{:.1}", self.level)
    }
}

/// Iso-levels between zMin and zMax, snapped to the interval.
pub fn levels(z_min: f64, z_max: f64, interval: f64) -> Vec<f64> {
    let start = (z_min / interval).ceil() * interval;
    let end = (z_max / interval).floor() * interval;
    if end < start {
        return Vec::new();
    }
    let count = ((end - start) / interval).round() as usize + 1;
    (0..count).map(|i| start + i as f64 * interval).collect()
}

/// A level is major iff it sits within epsilon of a multiple of the
/// major interval.
pub fn is_major(level: f64, major_interval: f64) -> bool {
    let r = level.rem_euclid(major_interval);
    r.min(major_interval - r) < MAJOR_EPSILON
}

/// Walk the polyline keeping only points at least `min_distance` apart.
/// The first point always stays; the final point is re-appended if the
/// filter dropped it.
pub fn minimum_distance_filter(points: &[Point], min_distance: f64) -> Vec<Point> {
    if points.len() < 3 || min_distance <= 0.0 {
        return points.to_vec();
    }
    let mut kept = vec![points[0]];
    for p in &points[1..] {
        let last = *kept.last().expect("kept is never empty");
        if last.distance(*p) >= min_distance {
            kept.push(*p);
        }
    }
    let tail = *points.last().expect("len checked above");
    if kept.len() > 1 && *kept.last().expect("kept is never empty") != tail {
        kept.push(tail);
    }
    kept
}

/// Extract all contour segments from a surface.
pub fn extract(surface: &Surface, settings: &TopographicSettings) -> Vec<ContourSegment> {
    let (z_min, z_max) = surface.z_range();
    let mut segments = Vec::new();

    for level in levels(z_min, z_max, settings.contour_interval) {
        let major = is_major(level, settings.major_contour);
        for polyline in trace_level(surface, level) {
            if polyline.len() < 2 {
                continue;
            }
            let filtered = minimum_distance_filter(&polyline, settings.minimum_distance);
            if filtered.len() < 2 {
                continue;
            }
            let label_anchor = if major && filtered.len() >= 3 {
                Some(filtered[filtered.len() / 2])
            } else {
                None
            };
            segments.push(ContourSegment {
                level,
                major,
                points: filtered,
                label_anchor,
            });
        }
    }

    log::debug!("extracted {} contour segments", segments.len());
    segments
}

/// Iso-value polylines of one level. Disjoint polylines are all retained.
pub fn trace_level(surface: &Surface, level: f64) -> Vec<Vec<Point>> {
    let crossings = match surface {
        Surface::Tin(tin) => tin_crossings(tin, level),
        Surface::Grid(grid) => march_squares(grid, level),
    };
    chain_segments(crossings)
}

// ── TIN tracing ──────────────────────────────────────────

/// Vertex elevations exactly on a level are nudged above it so the
/// straddle test still sees a crossing on the adjacent edges.
const VERTEX_NUDGE: f64 = 1e-9;

/// Per-triangle crossings: each triangle whose vertex elevations straddle
/// the level contributes one segment between its two crossed edges.
fn tin_crossings(tin: &TinSurface, level: f64) -> Vec<(Point, Point)> {
    let nudge = |z: f64| {
        if (z - level).abs() < VERTEX_NUDGE {
            level + VERTEX_NUDGE
        } else {
            z
        }
    };
    let mut segments = Vec::new();
    for t in tin.triangles() {
        let mut hits: Vec<Point> = Vec::with_capacity(2);
        for (i, j) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
            let (pa, za) = tin.vertex(i);
            let (pb, zb) = tin.vertex(j);
            let (za, zb) = (nudge(za), nudge(zb));
            if (za - level) * (zb - level) < 0.0 {
                let s = (level - za) / (zb - za);
                hits.push(pa.lerp(pb, s));
            }
        }
        if hits.len() == 2 {
            segments.push((hits[0], hits[1]));
        }
    }
    segments
}

// ── Grid tracing ─────────────────────────────────────────

/// Cell-by-cell marching squares over the lattice. Cells with any NaN
/// corner are skipped.
fn march_squares(grid: &GridSurface, level: f64) -> Vec<(Point, Point)> {
    let mut segments = Vec::new();
    for row in 0..grid.ny - 1 {
        for col in 0..grid.nx - 1 {
            let bl = grid.node(row, col);
            let br = grid.node(row, col + 1);
            let tl = grid.node(row + 1, col);
            let tr = grid.node(row + 1, col + 1);
            if bl.is_nan() || br.is_nan() || tl.is_nan() || tr.is_nan() {
                continue;
            }

            let p_bl = grid.node_point(row, col);
            let p_br = grid.node_point(row, col + 1);
            let p_tl = grid.node_point(row + 1, col);
            let p_tr = grid.node_point(row + 1, col + 1);

            let mut index = 0u8;
            if bl >= level {
                index |= 1;
            }
            if br >= level {
                index |= 2;
            }
            if tr >= level {
                index |= 4;
            }
            if tl >= level {
                index |= 8;
            }

            let bottom = || edge_crossing(p_bl, p_br, bl, br, level);
            let right = || edge_crossing(p_br, p_tr, br, tr, level);
            let top = || edge_crossing(p_tl, p_tr, tl, tr, level);
            let left = || edge_crossing(p_bl, p_tl, bl, tl, level);

            match index {
                0 | 15 => {}
                1 | 14 => segments.push((left(), bottom())),
                2 | 13 => segments.push((bottom(), right())),
                3 | 12 => segments.push((left(), right())),
                4 | 11 => segments.push((right(), top())),
                5 => {
                    // saddle: two separate crossings
                    segments.push((left(), top()));
                    segments.push((bottom(), right()));
                }
                6 | 9 => segments.push((bottom(), top())),
                7 | 8 => segments.push((left(), top())),
                10 => {
                    segments.push((left(), bottom()));
                    segments.push((right(), top()));
                }
                _ => unreachable!("4-bit cell index"),
            }
        }
    }
    segments
}

/// Linear interpolation of the level crossing along a cell edge.
fn edge_crossing(p1: Point, p2: Point, v1: f64, v2: f64, level: f64) -> Point {
    if (v2 - v1).abs() < 1e-12 {
        return p1.midpoint(p2);
    }
    let t = ((level - v1) / (v2 - v1)).clamp(0.0, 1.0);
    p1.lerp(p2, t)
}

// ── Chaining ─────────────────────────────────────────────

/// Connect unordered crossing segments into continuous polylines,
/// growing at both ends until no segment matches.
fn chain_segments(segments: Vec<(Point, Point)>) -> Vec<Vec<Point>> {
    let mut polylines = Vec::new();
    let mut used = vec![false; segments.len()];

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut points = vec![segments[start].0, segments[start].1];

        let mut grew = true;
        while grew {
            grew = false;
            let head = points[0];
            let tail = *points.last().expect("polyline is never empty");
            for (i, seg) in segments.iter().enumerate() {
                if used[i] {
                    continue;
                }
                if close(seg.0, tail) {
                    points.push(seg.1);
                } else if close(seg.1, tail) {
                    points.push(seg.0);
                } else if close(seg.0, head) {
                    points.insert(0, seg.1);
                } else if close(seg.1, head) {
                    points.insert(0, seg.0);
                } else {
                    continue;
                }
                used[i] = true;
                grew = true;
                break;
            }
        }
        polylines.push(points);
    }
    polylines
}

fn close(a: Point, b: Point) -> bool {
    a.distance(b) < CHAIN_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SurfaceMode, TopographicSettings};
    use crate::terrain::{build_surface, ElevationSample};

    #[test]
    fn level_generation_snaps_to_interval() {
        assert_eq!(levels(10.2, 14.7, 1.0), vec![11.0, 12.0, 13.0, 14.0]);
        assert_eq!(levels(10.0, 10.5, 1.0), vec![10.0]);
        assert!(levels(10.2, 10.7, 1.0).is_empty());
    }

    #[test]
    fn major_classification() {
        for level in [11.0, 12.0, 13.0, 14.0] {
            assert!(!is_major(level, 5.0), "{level} should be minor");
        }
        assert!(is_major(10.0, 5.0));
        assert!(is_major(15.0, 5.0));
        assert!(is_major(15.0005, 5.0));
        assert!(is_major(14.9995, 5.0));
    }

    #[test]
    fn minimum_distance_filter_on_evenly_spaced_points() {
        // 101 collinear points, spacing 0.01, threshold 0.1
        let points: Vec<Point> = (0..=100).map(|i| Point::new(i as f64 * 0.01, 0.0)).collect();
        let kept = minimum_distance_filter(&points, 0.1);
        assert_eq!(kept[0], points[0]);
        assert_eq!(*kept.last().unwrap(), points[100]);
        assert!((10..=12).contains(&kept.len()), "kept {}", kept.len());
        for pair in kept.windows(2).take(kept.len() - 2) {
            assert!(pair[0].distance(pair[1]) >= 0.1 - 1e-12);
        }
    }

    #[test]
    fn filter_keeps_short_polylines_intact() {
        let points = vec![Point::new(0.0, 0.0), Point::new(0.001, 0.0)];
        assert_eq!(minimum_distance_filter(&points, 0.1).len(), 2);
    }

    fn ramp_samples() -> Vec<ElevationSample> {
        // z = x: vertical iso-lines
        let mut samples = Vec::new();
        for x in 0..=10 {
            for y in [0.0, 10.0] {
                samples.push(ElevationSample {
                    x: x as f64,
                    y,
                    z: x as f64,
                });
            }
        }
        samples
    }

    fn topo(mode: SurfaceMode) -> TopographicSettings {
        TopographicSettings {
            surface: mode,
            contour_interval: 1.0,
            major_contour: 5.0,
            minimum_distance: 0.0,
            grid_resolution: 11,
            smoothing: 0.0,
            ..TopographicSettings::default()
        }
    }

    #[test]
    fn tin_traces_vertical_isolines_on_a_ramp() {
        let surface = build_surface(&ramp_samples(), &topo(SurfaceMode::Tin)).unwrap();
        let lines = trace_level(&surface, 4.5);
        assert_eq!(lines.len(), 1, "one connected polyline expected");
        for p in &lines[0] {
            assert!((p.x - 4.5).abs() < 1e-9);
        }
        // spans the full y extent
        let ys: Vec<f64> = lines[0].iter().map(|p| p.y).collect();
        let (min, max) = ys.iter().fold((f64::MAX, f64::MIN), |(lo, hi), y| {
            (lo.min(*y), hi.max(*y))
        });
        assert!((min - 0.0).abs() < 1e-9 && (max - 10.0).abs() < 1e-9);
    }

    #[test]
    fn level_on_a_vertex_elevation_still_traces() {
        // the level-5 iso-line passes exactly through the center vertex
        let samples = vec![
            ElevationSample { x: 0.0, y: 0.0, z: 0.0 },
            ElevationSample { x: 10.0, y: 0.0, z: 10.0 },
            ElevationSample { x: 10.0, y: 10.0, z: 10.0 },
            ElevationSample { x: 0.0, y: 10.0, z: 0.0 },
            ElevationSample { x: 5.0, y: 5.0, z: 5.0 },
        ];
        let surface = build_surface(&samples, &topo(SurfaceMode::Tin)).unwrap();
        let lines = trace_level(&surface, 5.0);
        assert!(!lines.is_empty(), "vertex-on-level contour must not vanish");
        for line in &lines {
            for p in line {
                assert!((p.x - 5.0).abs() < 1e-6, "x = {}", p.x);
            }
        }
    }

    #[test]
    fn grid_traces_vertical_isolines_on_a_ramp() {
        let surface = build_surface(&ramp_samples(), &topo(SurfaceMode::Grid)).unwrap();
        // the ramp is symmetric about x = 5, so the level-5 iso-line sits
        // on the x = 5 lattice column regardless of interpolation bias
        let lines = trace_level(&surface, 5.0);
        assert!(!lines.is_empty());
        for line in &lines {
            for p in line {
                assert!((p.x - 5.0).abs() < 1e-3, "x = {}", p.x);
            }
        }
    }

    #[test]
    fn extract_classifies_and_anchors() {
        let surface = build_surface(&ramp_samples(), &topo(SurfaceMode::Tin)).unwrap();
        let segments = extract(&surface, &topo(SurfaceMode::Tin));
        assert!(!segments.is_empty());
        // ramp z range 0..10: levels 0..=10, majors at 0, 5, 10
        for seg in &segments {
            assert_eq!(seg.major, seg.level % 5.0 == 0.0);
            if seg.major && seg.points.len() >= 3 {
                let anchor = seg.label_anchor.expect("major line gets an anchor");
                assert_eq!(anchor, seg.points[seg.points.len() / 2]);
                assert_eq!(seg.label_text(), format!("{:.1}", seg.level));
            } else {
                assert!(seg.label_anchor.is_none() || seg.major);
            }
        }
        let majors = segments.iter().filter(|s| s.major).count();
        assert!(majors >= 1);
    }
}
