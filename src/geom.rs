//! Shared coordinate geometry: winding, normals, areas, extents.

use kurbo::{Point, Rect, Vec2};

use crate::error::PlanError;
use crate::model::Coordinate;

/// Polygon winding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Clockwise,
    CounterClockwise,
}

/// Winding of a vertex ring via the shoelace sum Σ(x2−x1)(y2+y1).
///
/// Positive sum = clockwise; zero or negative = counter-clockwise.
pub fn polygon_orientation(points: &[Point]) -> Orientation {
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += (b.x - a.x) * (b.y + a.y);
    }
    if sum > 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::CounterClockwise
    }
}

/// Signed area via the shoelace formula. Positive = CCW, negative = CW.
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            points[i].x * points[j].y - points[j].x * points[i].y
        })
        .sum::<f64>()
        / 2.0
}

/// Vertex centroid (arithmetic mean), used for parcel name placement.
pub fn centroid(points: &[Point]) -> Point {
    let n = points.len() as f64;
    let sum = points
        .iter()
        .fold(Vec2::ZERO, |acc, p| acc + p.to_vec2());
    Point::new(sum.x / n, sum.y / n)
}

/// (inside, outside) normals of the edge p1→p2 relative to the polygon
/// interior. Unnormalized; callers scale as needed.
///
/// For CCW polygons the interior is to the left of the edge, so inside is
/// the +90° rotation (−dy, dx); for CW polygons the pair swaps.
pub fn line_normals(p1: Point, p2: Point, orientation: Orientation) -> (Vec2, Vec2) {
    let d = p2 - p1;
    let left = Vec2::new(-d.y, d.x);
    let right = Vec2::new(d.y, -d.x);
    match orientation {
        Orientation::CounterClockwise => (left, right),
        Orientation::Clockwise => (right, left),
    }
}

/// Reading direction of a line at the given angle (degrees from +x).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

pub fn line_direction(angle_deg: f64) -> Direction {
    if (-90.0..=90.0).contains(&angle_deg) {
        Direction::LeftToRight
    } else {
        Direction::RightToLeft
    }
}

/// 2-D extent of a coordinate set. Undefined (DataError) when empty.
pub fn bounding_box(coords: &[Coordinate]) -> Result<Rect, PlanError> {
    let first = coords
        .first()
        .ok_or_else(|| PlanError::Data("bounding box of empty coordinate set".to_string()))?;
    let mut min_x = first.easting;
    let mut min_y = first.northing;
    let mut max_x = first.easting;
    let mut max_y = first.northing;
    for c in &coords[1..] {
        min_x = min_x.min(c.easting);
        min_y = min_y.min(c.northing);
        max_x = max_x.max(c.easting);
        max_y = max_y.max(c.northing);
    }
    Ok(Rect::new(min_x, min_y, max_x, max_y))
}
