//! Distance/bearing label placement along traverse legs.
//!
//! Labels ride the leg at 20% / 50% / 80% of its length, pushed off the
//! line by one drawing-scale unit: bearing degrees and minutes sit on the
//! outside of the polygon, the distance on the inside. Text is rotated to
//! the leg angle and flipped to stay upright.

use kurbo::Point;

use crate::geom::{self, Direction, Orientation};
use crate::model::{Coordinate, TraverseLeg};
use crate::render::{Layer, Primitive, TextAlign};

/// Place the three labels for one leg. `offset` is the perpendicular push
/// distance in survey units (one drawing-scale unit).
pub fn leg_labels(
    leg: &TraverseLeg,
    from: &Coordinate,
    to: &Coordinate,
    orientation: Orientation,
    offset: f64,
    height: f64,
) -> Vec<Primitive> {
    let p1 = Point::new(from.easting, from.northing);
    let p2 = Point::new(to.easting, to.northing);

    // a zero-length leg has no direction to ride
    if p1.distance(p2) < f64::EPSILON {
        return Vec::new();
    }

    let angle_deg = (p2.y - p1.y).atan2(p2.x - p1.x).to_degrees();

    let first = p1.lerp(p2, 0.2);
    let mid = p1.lerp(p2, 0.5);
    let last = p1.lerp(p2, 0.8);

    let (inside, outside) = geom::line_normals(p1, p2, orientation);
    let inside = inside / inside.hypot() * offset;
    let outside = outside / outside.hypot() * offset;

    let first = first + outside;
    let last = last + outside;
    let mid = mid + inside;

    // Flip so the text reads left-to-right along the drawing's x axis.
    let mut text_angle = angle_deg;
    if !(-90.0..=90.0).contains(&text_angle) {
        text_angle += 180.0;
    }

    let text = |content: String, position: Point| Primitive::Text {
        layer: Layer::Labels,
        content,
        position,
        height,
        rotation: text_angle,
        align: TextAlign::MiddleCenter,
    };

    let distance = text(format!("{:.2} m", leg.distance), mid);
    let degrees = format!("{}\u{00b0}", leg.bearing.degrees);
    let minutes = format!("{}'", leg.bearing.minutes);

    // Reading along the direction of travel always meets degrees first.
    let (deg_at, min_at) = match geom::line_direction(angle_deg) {
        Direction::LeftToRight => (first, last),
        Direction::RightToLeft => (last, first),
    };

    vec![distance, text(degrees, deg_at), text(minutes, min_at)]
}
