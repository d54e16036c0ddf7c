//! Frame geometry: outer/offset border, title anchor, footer tiling,
//! north-arrow anchor. Pure functions over the survey bounding box; the
//! layout engine turns these into primitives.

use kurbo::{Point, Rect};

/// Fraction added to both margin fractions for the second, larger frame
/// that forms the double border.
const OFFSET_FRACTION: f64 = 0.03;

/// Title anchor sits this fraction of the Y margin below the frame top.
const TITLE_DROP: f64 = 0.2;

/// Title text occupies this fraction of the frame width.
const TITLE_WIDTH: f64 = 0.6;

/// Graphical scale bar length as a fraction of the frame width.
const SCALE_BAR_WIDTH: f64 = 0.4;

/// Footer strip height as a fraction of the frame height.
const FOOTER_HEIGHT: f64 = 0.25;

/// North arrow sits this fraction of the frame height below the frame top.
const NORTH_ARROW_DROP: f64 = 0.07;

/// Derived frame geometry for one plan.
#[derive(Debug, Clone)]
pub struct FrameLayout {
    pub frame: Rect,
    pub offset: Rect,
    pub margin_x: f64,
    pub margin_y: f64,
}

impl FrameLayout {
    /// Expand the survey bbox by asymmetric margins.
    ///
    /// Both margins derive from the larger bbox dimension; the Y fraction is
    /// intentionally much larger than X to reserve room above for the title
    /// block and below for the footer strip.
    pub fn derive(bbox: Rect, margin_x_fraction: f64, margin_y_fraction: f64) -> Self {
        let longest = bbox.width().max(bbox.height());
        let margin_x = longest * margin_x_fraction;
        let margin_y = longest * margin_y_fraction;
        let offset_x = longest * (margin_x_fraction + OFFSET_FRACTION);
        let offset_y = longest * (margin_y_fraction + OFFSET_FRACTION);
        Self {
            frame: bbox.inflate(margin_x, margin_y),
            offset: bbox.inflate(offset_x, offset_y),
            margin_x,
            margin_y,
        }
    }

    /// Anchor for the title text: centered, just below the frame top.
    pub fn title_anchor(&self) -> Point {
        Point::new(self.frame.center().x, self.frame.y1 - self.margin_y * TITLE_DROP)
    }

    pub fn title_width(&self) -> f64 {
        self.frame.width() * TITLE_WIDTH
    }

    pub fn scale_bar_length(&self) -> f64 {
        self.frame.width() * SCALE_BAR_WIDTH
    }

    /// Tile the bottom strip into `count` equal-width boxes with no gaps.
    pub fn footer_boxes(&self, count: usize) -> Vec<Rect> {
        if count == 0 {
            return Vec::new();
        }
        let box_width = self.frame.width() / count as f64;
        let box_height = self.frame.height() * FOOTER_HEIGHT;
        (0..count)
            .map(|i| {
                let x1 = self.frame.x0 + i as f64 * box_width;
                Rect::new(x1, self.frame.y0, x1 + box_width, self.frame.y0 + box_height)
            })
            .collect()
    }

    /// North arrow anchor: easting of the first boundary/parcel vertex,
    /// slightly below the frame top.
    pub fn north_arrow_anchor(&self, first_vertex: Point) -> Point {
        Point::new(
            first_vertex.x,
            self.frame.y1 - self.frame.height() * NORTH_ARROW_DROP,
        )
    }

    /// Corner ring of a rectangle, for closed-polyline emission.
    pub fn corners(rect: Rect) -> Vec<Point> {
        vec![
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> FrameLayout {
        FrameLayout::derive(Rect::new(100.0, 200.0, 180.0, 240.0), 0.35, 0.8)
    }

    #[test]
    fn frame_strictly_contains_bbox() {
        let bbox = Rect::new(100.0, 200.0, 180.0, 240.0);
        let fl = FrameLayout::derive(bbox, 0.35, 0.8);
        assert!(fl.frame.x0 < bbox.x0 && fl.frame.y0 < bbox.y0);
        assert!(fl.frame.x1 > bbox.x1 && fl.frame.y1 > bbox.y1);
    }

    #[test]
    fn offset_frame_strictly_contains_base_frame() {
        let fl = layout();
        assert!(fl.offset.x0 < fl.frame.x0 && fl.offset.y0 < fl.frame.y0);
        assert!(fl.offset.x1 > fl.frame.x1 && fl.offset.y1 > fl.frame.y1);
    }

    #[test]
    fn margins_use_the_longest_dimension() {
        // bbox is 80 wide, 40 tall: both margins derive from 80
        let fl = layout();
        assert!((fl.margin_x - 80.0 * 0.35).abs() < 1e-9);
        assert!((fl.margin_y - 80.0 * 0.8).abs() < 1e-9);
    }

    #[test]
    fn footer_tiling_has_no_gaps_or_overlaps() {
        let fl = layout();
        let boxes = fl.footer_boxes(4);
        assert_eq!(boxes.len(), 4);
        let expected_width = fl.frame.width() / 4.0;
        for b in &boxes {
            assert!((b.width() - expected_width).abs() < 1e-9);
            assert!((b.height() - fl.frame.height() * 0.25).abs() < 1e-9);
            assert!((b.y0 - fl.frame.y0).abs() < 1e-9);
        }
        for pair in boxes.windows(2) {
            assert!((pair[0].x1 - pair[1].x0).abs() < 1e-9);
        }
        assert!((boxes[0].x0 - fl.frame.x0).abs() < 1e-9);
        assert!((boxes[3].x1 - fl.frame.x1).abs() < 1e-9);
        assert!(fl.footer_boxes(0).is_empty());
    }

    #[test]
    fn title_anchor_position() {
        let fl = layout();
        let anchor = fl.title_anchor();
        assert!((anchor.x - fl.frame.center().x).abs() < 1e-9);
        assert!((anchor.y - (fl.frame.y1 - fl.margin_y * 0.2)).abs() < 1e-9);
        assert!((fl.title_width() - fl.frame.width() * 0.6).abs() < 1e-9);
    }

    #[test]
    fn north_arrow_anchor_tracks_first_vertex_easting() {
        let fl = layout();
        let anchor = fl.north_arrow_anchor(Point::new(142.0, 210.0));
        assert!((anchor.x - 142.0).abs() < 1e-9);
        assert!((anchor.y - (fl.frame.y1 - fl.frame.height() * 0.07)).abs() < 1e-9);
    }
}
