//! DXF backend: a [`DrawSurface`] that accumulates entities and writes an
//! AutoCAD R2010 file.
//!
//! Placement extents come from the shared estimate in [`crate::render`], so
//! measured-placement layout agrees with the recording surface used in
//! tests and dry runs.

use std::collections::HashSet;
use std::path::Path;

use dxf::entities::{Circle, Entity, EntityCommon, EntityType, Line, LwPolyline, MText, Text};
use dxf::enums::{AcadVersion, AttachmentPoint};
use dxf::{Color, Drawing, LwPolylineVertex};
use kurbo::{Point, Rect, Vec2};

use crate::error::PlanError;
use crate::render::{self, DrawSurface, Layer, MarkerKind, Primitive, TextAlign};

/// Tick count on the graphical scale bar, including both ends.
const SCALE_BAR_TICKS: usize = 5;

pub struct DxfSurface {
    drawing: Drawing,
    layers: HashSet<&'static str>,
    entities: usize,
}

impl DxfSurface {
    pub fn new() -> Self {
        let mut drawing = Drawing::new();
        drawing.header.version = AcadVersion::R2010;
        Self {
            drawing,
            layers: HashSet::new(),
            entities: 0,
        }
    }

    /// Entities written so far.
    pub fn entity_count(&self) -> usize {
        self.entities
    }

    pub fn save(&self, path: &Path) -> Result<(), PlanError> {
        self.drawing
            .save_file(path)
            .map_err(|e| PlanError::render("dxf save", e.to_string()))
    }

    fn ensure_layer(&mut self, layer: Layer) {
        if self.layers.insert(layer.name()) {
            self.drawing.add_layer(dxf::tables::Layer {
                name: layer.name().to_string(),
                color: Color::from_index(layer.color()),
                ..Default::default()
            });
        }
    }

    fn push(&mut self, layer: Layer, specific: EntityType) {
        self.ensure_layer(layer);
        self.drawing.add_entity(Entity {
            common: EntityCommon {
                layer: layer.name().to_string(),
                color: Color::from_index(layer.color()),
                ..Default::default()
            },
            specific,
        });
        self.entities += 1;
    }

    fn push_polyline(&mut self, layer: Layer, points: &[Point], closed: bool) {
        if points.is_empty() {
            return;
        }
        let mut polyline = LwPolyline::default();
        for p in points {
            polyline.vertices.push(LwPolylineVertex {
                x: p.x,
                y: p.y,
                ..Default::default()
            });
        }
        polyline.set_is_closed(closed);
        self.push(layer, EntityType::LwPolyline(polyline));
    }

    fn push_line(&mut self, layer: Layer, a: Point, b: Point) {
        self.push(
            layer,
            EntityType::Line(Line {
                p1: dxf_point(a),
                p2: dxf_point(b),
                ..Default::default()
            }),
        );
    }

    fn push_text(
        &mut self,
        layer: Layer,
        content: &str,
        position: Point,
        height: f64,
        rotation: f64,
        align: TextAlign,
    ) {
        // DXF text anchors bottom-left; recenter by hand so the alignment
        // math stays in one place.
        let location = match align {
            TextAlign::BottomLeft => position,
            TextAlign::MiddleCenter => {
                let (w, h) = render::text_extent(content, height);
                let theta = rotation.to_radians();
                let local = Vec2::new(-w / 2.0, -h / 2.0);
                let rotated = Vec2::new(
                    local.x * theta.cos() - local.y * theta.sin(),
                    local.x * theta.sin() + local.y * theta.cos(),
                );
                position + rotated
            }
        };
        self.push(
            layer,
            EntityType::Text(Text {
                value: content.to_string(),
                location: dxf_point(location),
                text_height: height,
                rotation,
                ..Default::default()
            }),
        );
    }

    fn push_marker(&mut self, layer: Layer, kind: MarkerKind, position: Point, size: f64) {
        match kind {
            MarkerKind::Dot => self.push_circle(layer, position, size * 0.25),
            MarkerKind::Circle => self.push_circle(layer, position, size * 0.5),
            MarkerKind::Box => {
                let half = size / 2.0;
                let rect = Rect::new(
                    position.x - half,
                    position.y - half,
                    position.x + half,
                    position.y + half,
                );
                self.push_polyline(
                    layer,
                    &[
                        Point::new(rect.x0, rect.y0),
                        Point::new(rect.x1, rect.y0),
                        Point::new(rect.x1, rect.y1),
                        Point::new(rect.x0, rect.y1),
                    ],
                    true,
                );
            }
            MarkerKind::Cross => {
                let half = size / 2.0;
                self.push_line(
                    layer,
                    Point::new(position.x - half, position.y),
                    Point::new(position.x + half, position.y),
                );
                self.push_line(
                    layer,
                    Point::new(position.x, position.y - half),
                    Point::new(position.x, position.y + half),
                );
            }
            MarkerKind::NorthArrow => {
                // shaft pointing up, arrowhead, and the letter N beside it
                let tip = position;
                let base = position - Vec2::new(0.0, size);
                self.push_line(layer, base, tip);
                let head = size * 0.2;
                self.push_polyline(
                    layer,
                    &[
                        Point::new(tip.x - head / 2.0, tip.y - head),
                        tip,
                        Point::new(tip.x + head / 2.0, tip.y - head),
                    ],
                    true,
                );
                self.push_text(
                    layer,
                    "N",
                    Point::new(tip.x + head, tip.y - head),
                    size * 0.3,
                    0.0,
                    TextAlign::BottomLeft,
                );
            }
        }
    }

    fn push_circle(&mut self, layer: Layer, center: Point, radius: f64) {
        self.push(
            layer,
            EntityType::Circle(Circle {
                center: dxf_point(center),
                radius,
                ..Default::default()
            }),
        );
    }

    fn push_scale_bar(&mut self, position: Point, length: f64) {
        let layer = Layer::TitleBlock;
        let left = Point::new(position.x - length / 2.0, position.y);
        let right = Point::new(position.x + length / 2.0, position.y);
        self.push_line(layer, left, right);
        let tick = length * 0.04;
        for i in 0..SCALE_BAR_TICKS {
            let t = i as f64 / (SCALE_BAR_TICKS - 1) as f64;
            let x = left.x + t * length;
            self.push_line(
                layer,
                Point::new(x, position.y),
                Point::new(x, position.y - tick),
            );
        }
    }
}

impl Default for DxfSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawSurface for DxfSurface {
    fn place(&mut self, primitive: &Primitive) -> Result<Rect, PlanError> {
        match primitive {
            Primitive::Polyline {
                layer,
                points,
                closed,
            } => self.push_polyline(*layer, points, *closed),
            Primitive::Text {
                layer,
                content,
                position,
                height,
                rotation,
                align,
            } => self.push_text(*layer, content, *position, *height, *rotation, *align),
            Primitive::MText {
                layer,
                content,
                position,
                width,
                char_height,
            } => self.push(
                *layer,
                EntityType::MText(MText {
                    text: content.clone(),
                    insertion_point: dxf_point(*position),
                    initial_text_height: *char_height,
                    reference_rectangle_width: *width,
                    attachment_point: AttachmentPoint::TopCenter,
                    ..Default::default()
                }),
            ),
            Primitive::Marker {
                layer,
                kind,
                position,
                size,
            } => self.push_marker(*layer, *kind, *position, *size),
            Primitive::ScaleBar { position, length } => self.push_scale_bar(*position, *length),
        }
        Ok(render::estimated_extent(primitive))
    }
}

fn dxf_point(p: Point) -> dxf::Point {
    dxf::Point::new(p.x, p.y, 0.0)
}
