//! Two-phase plan generation.
//!
//! [`derive_layout`] is pure: it turns a [`Plan`] into an ordered list of
//! primitives plus a pending title block, without touching a renderer.
//! [`render`] then emits everything through a [`DrawSurface`], running the
//! measured-placement protocol for the title block: each dependent element
//! is positioned only from bounding boxes the renderer reported for the
//! previous one.

use kurbo::{Point, Vec2};

use crate::contour;
use crate::error::PlanError;
use crate::frame::FrameLayout;
use crate::geom;
use crate::index::CoordinateIndex;
use crate::labels;
use crate::markup;
use crate::model::{
    BeaconStyle, CadastralData, Coordinate, Plan, PlanCore, PlanKind, TopographicData, TraverseLeg,
};
use crate::render::{DrawSurface, Layer, MarkerKind, Primitive, TextAlign};
use crate::terrain::{self, ElevationSample};

const CADASTRAL_MARGINS: (f64, f64) = (0.35, 0.7);
const TOPOGRAPHIC_MARGINS: (f64, f64) = (0.35, 0.8);

/// Scale bar drop below the measured title box, as a fraction of the bar
/// length.
const SCALE_BAR_DROP: f64 = 0.05;

/// Vertical spacing factor between stacked title-block annotation lines.
const ANNOTATION_SPACING: f64 = 1.5;

/// Deferred title block. Placement depends on renderer-measured text
/// extents, so only the inputs are derived here.
#[derive(Debug, Clone)]
pub struct TitleBlock {
    /// Markup-translated title text, underlined.
    pub content: String,
    /// Top-center anchor of the title text.
    pub anchor: Point,
    pub width: f64,
    pub char_height: f64,
    /// Graphical scale bar length; `None` skips the bar step.
    pub scale_bar_length: Option<f64>,
    /// Origin/area lines stacked beneath the last measured box.
    pub annotations: Vec<String>,
    pub annotation_height: f64,
}

/// A fully derived drawing: ordered primitives plus the pending title
/// block. Identical plans produce identical layouts.
#[derive(Debug, Clone)]
pub struct LayoutPlan {
    pub primitives: Vec<Primitive>,
    pub title_block: Option<TitleBlock>,
    /// Ids referenced by parcels, legs or the boundary that did not
    /// resolve to a coordinate. Skipped, never fatal.
    pub skipped_ids: Vec<String>,
}

/// Derive the complete layout for a plan. Fails only on malformed plans
/// (Validation) or an empty coordinate set (Data); contouring problems
/// degrade to a partial drawing.
pub fn derive_layout(plan: &Plan) -> Result<LayoutPlan, PlanError> {
    plan.validate()?;
    let mut layout = match &plan.kind {
        PlanKind::Cadastral(data) => derive_cadastral(&plan.core, data)?,
        PlanKind::Topographic(data) => derive_topographic(&plan.core, data)?,
    };
    apply_drawing_scale(&mut layout, plan.drawing_scale());
    log::info!(
        "derived layout: {} primitives, {} skipped ids",
        layout.primitives.len(),
        layout.skipped_ids.len()
    );
    Ok(layout)
}

/// Emit a derived layout through a renderer.
pub fn render(layout: &LayoutPlan, surface: &mut dyn DrawSurface) -> Result<(), PlanError> {
    for primitive in &layout.primitives {
        surface.place(primitive)?;
    }
    if let Some(tb) = &layout.title_block {
        render_title_block(tb, surface)?;
    }
    Ok(())
}

/// Measure-then-place: title text first, then the scale bar centered
/// under the measured title, then annotation lines stacked beneath the
/// measured bar. No step reads hidden renderer state.
fn render_title_block(tb: &TitleBlock, surface: &mut dyn DrawSurface) -> Result<(), PlanError> {
    let mut above = surface.place(&Primitive::MText {
        layer: Layer::TitleBlock,
        content: tb.content.clone(),
        position: tb.anchor,
        width: tb.width,
        char_height: tb.char_height,
    })?;

    if let Some(length) = tb.scale_bar_length {
        above = surface.place(&Primitive::ScaleBar {
            position: Point::new(above.center().x, above.y0 - SCALE_BAR_DROP * length),
            length,
        })?;
    }

    for line in &tb.annotations {
        let position = Point::new(
            above.center().x,
            above.y0 - tb.annotation_height * ANNOTATION_SPACING,
        );
        above = surface.place(&Primitive::Text {
            layer: Layer::TitleBlock,
            content: line.clone(),
            position,
            height: tb.annotation_height,
            rotation: 0.0,
            align: TextAlign::MiddleCenter,
        })?;
    }
    Ok(())
}

// ── Cadastral path ───────────────────────────────────────

fn derive_cadastral(core: &PlanCore, data: &CadastralData) -> Result<LayoutPlan, PlanError> {
    let bbox = geom::bounding_box(&core.coordinates)?;
    let index = CoordinateIndex::build(&core.coordinates);
    let mut primitives = Vec::new();
    let mut skipped_ids = Vec::new();

    emit_beacons(&mut primitives, core, core.coordinates.iter());

    let mut first_vertex = None;
    for parcel in &data.parcels {
        let resolved = index.resolve(&parcel.ids);
        skipped_ids.extend(resolved.skipped.iter().cloned());
        let points = resolved.points();
        if points.is_empty() {
            continue;
        }
        if first_vertex.is_none() {
            first_vertex = Some(points[0]);
        }

        primitives.push(Primitive::Polyline {
            layer: Layer::Parcels,
            points: points.clone(),
            closed: true,
        });
        if !parcel.name.is_empty() {
            primitives.push(Primitive::Text {
                layer: Layer::Labels,
                content: parcel.name.clone(),
                position: geom::centroid(&points),
                height: core.label_scale,
                rotation: 0.0,
                align: TextAlign::MiddleCenter,
            });
        }

        let orientation = geom::polygon_orientation(&points);
        emit_leg_labels(
            &mut primitives,
            &mut skipped_ids,
            &index,
            &parcel.legs,
            orientation,
            core,
        );
    }

    let fl = FrameLayout::derive(bbox, CADASTRAL_MARGINS.0, CADASTRAL_MARGINS.1);
    emit_frame_furniture(&mut primitives, core, &fl, first_vertex);

    Ok(LayoutPlan {
        primitives,
        title_block: Some(TitleBlock {
            content: underlined_title(core),
            anchor: fl.title_anchor(),
            width: fl.title_width(),
            char_height: core.font_size,
            scale_bar_length: None,
            annotations: Vec::new(),
            annotation_height: core.font_size * 0.7,
        }),
        skipped_ids,
    })
}

// ── Topographic path ─────────────────────────────────────

fn derive_topographic(core: &PlanCore, data: &TopographicData) -> Result<LayoutPlan, PlanError> {
    let bbox = geom::bounding_box(&core.coordinates)?;
    let index = CoordinateIndex::build(&core.coordinates);
    let settings = &data.settings;
    let visibility = &settings.visibility;
    let mut primitives = Vec::new();
    let mut skipped_ids = Vec::new();

    if visibility.spot_heights {
        let size = 0.1 * settings.point_label_scale;
        for coord in &core.coordinates {
            let position = Point::new(coord.easting, coord.northing);
            primitives.push(Primitive::Marker {
                layer: Layer::SpotHeights,
                kind: MarkerKind::Cross,
                position,
                size,
            });
            primitives.push(Primitive::Text {
                layer: Layer::SpotHeights,
                content: format!("{}", coord.elevation),
                position: position + Vec2::new(size, size),
                height: settings.point_label_scale,
                rotation: 0.0,
                align: TextAlign::BottomLeft,
            });
        }
    }

    let mut first_vertex = None;
    let mut boundary_area = None;
    if let Some(boundary) = &data.boundary {
        let resolved = index.resolve(&boundary.ids);
        skipped_ids.extend(resolved.skipped.iter().cloned());
        let points = resolved.points();
        if !points.is_empty() {
            first_vertex = Some(points[0]);
            if points.len() >= 3 {
                boundary_area = Some(geom::signed_area(&points).abs());
            }
        }

        if visibility.boundary && !points.is_empty() {
            // boundary beacons, deduplicated by id
            let mut seen: Vec<&str> = Vec::new();
            let unique = resolved.coords.iter().copied().filter(|c| {
                if seen.contains(&c.id.as_str()) {
                    false
                } else {
                    seen.push(c.id.as_str());
                    true
                }
            });
            emit_beacons(&mut primitives, core, unique);

            primitives.push(Primitive::Polyline {
                layer: Layer::Boundary,
                points: points.clone(),
                closed: true,
            });
            let orientation = geom::polygon_orientation(&points);
            emit_leg_labels(
                &mut primitives,
                &mut skipped_ids,
                &index,
                &boundary.legs,
                orientation,
                core,
            );
        }
    }

    if visibility.contours {
        let samples: Vec<ElevationSample> = core
            .coordinates
            .iter()
            .map(|c| ElevationSample {
                x: c.easting,
                y: c.northing,
                z: c.elevation,
            })
            .collect();
        match terrain::build_surface(&samples, settings) {
            Ok(surface) => {
                if visibility.mesh {
                    primitives.extend(surface.mesh_primitives());
                }
                for segment in contour::extract(&surface, settings) {
                    let layer = if segment.major {
                        Layer::ContourMajor
                    } else {
                        Layer::ContourMinor
                    };
                    primitives.push(Primitive::Polyline {
                        layer,
                        points: segment.points.clone(),
                        closed: false,
                    });
                    if visibility.contour_labels {
                        if let Some(anchor) = segment.label_anchor {
                            primitives.push(Primitive::Text {
                                layer: Layer::ContourLabels,
                                content: segment.label_text(),
                                position: anchor,
                                height: settings.contour_label_scale,
                                rotation: 0.0,
                                align: TextAlign::MiddleCenter,
                            });
                        }
                    }
                }
            }
            // contouring aborts, the rest of the drawing proceeds
            Err(err) => log::warn!("skipping contours: {err}"),
        }
    }

    let fl = FrameLayout::derive(bbox, TOPOGRAPHIC_MARGINS.0, TOPOGRAPHIC_MARGINS.1);
    emit_frame_furniture(&mut primitives, core, &fl, first_vertex);

    let mut annotations = vec![format!("ORIGIN :- {}", core.origin.to_uppercase())];
    if let Some(area) = boundary_area {
        annotations.push(format!("AREA :- {:.2} SQ.METRES", area));
    }

    Ok(LayoutPlan {
        primitives,
        title_block: Some(TitleBlock {
            content: underlined_title(core),
            anchor: fl.title_anchor(),
            width: fl.title_width(),
            char_height: core.font_size,
            scale_bar_length: Some(fl.scale_bar_length()),
            annotations,
            annotation_height: core.font_size * 0.7,
        }),
        skipped_ids,
    })
}

// ── Shared emission helpers ──────────────────────────────

fn beacon_marker(style: BeaconStyle) -> Option<MarkerKind> {
    match style {
        BeaconStyle::Dot => Some(MarkerKind::Dot),
        BeaconStyle::Circle => Some(MarkerKind::Circle),
        BeaconStyle::Box => Some(MarkerKind::Box),
        BeaconStyle::None => None,
    }
}

fn emit_beacons<'a>(
    primitives: &mut Vec<Primitive>,
    core: &PlanCore,
    coords: impl Iterator<Item = &'a Coordinate>,
) {
    let Some(kind) = beacon_marker(core.beacon_style) else {
        return;
    };
    for coord in coords {
        let position = Point::new(coord.easting, coord.northing);
        primitives.push(Primitive::Marker {
            layer: Layer::Beacons,
            kind,
            position,
            size: core.beacon_size,
        });
        primitives.push(Primitive::Text {
            layer: Layer::Labels,
            content: coord.id.clone(),
            position: position + Vec2::new(1.0, 1.0),
            height: core.label_scale,
            rotation: 0.0,
            align: TextAlign::BottomLeft,
        });
    }
}

fn emit_leg_labels(
    primitives: &mut Vec<Primitive>,
    skipped_ids: &mut Vec<String>,
    index: &CoordinateIndex,
    legs: &[TraverseLeg],
    orientation: geom::Orientation,
    core: &PlanCore,
) {
    // one drawing-scale unit off the line
    let offset = 1000.0 / core.scale;
    for leg in legs {
        match (index.get(&leg.from), index.get(&leg.to)) {
            (Some(from), Some(to)) => {
                primitives.extend(labels::leg_labels(
                    leg,
                    from,
                    to,
                    orientation,
                    offset,
                    core.label_scale,
                ));
            }
            (from, to) => {
                if from.is_none() {
                    skipped_ids.push(leg.from.clone());
                }
                if to.is_none() {
                    skipped_ids.push(leg.to.clone());
                }
            }
        }
    }
}

/// Frames, north arrow and footer boxes, shared by both plan kinds.
fn emit_frame_furniture(
    primitives: &mut Vec<Primitive>,
    core: &PlanCore,
    fl: &FrameLayout,
    first_vertex: Option<Point>,
) {
    primitives.push(Primitive::Polyline {
        layer: Layer::Frame,
        points: FrameLayout::corners(fl.frame),
        closed: true,
    });
    primitives.push(Primitive::Polyline {
        layer: Layer::Frame,
        points: FrameLayout::corners(fl.offset),
        closed: true,
    });

    if let Some(vertex) = first_vertex {
        primitives.push(Primitive::Marker {
            layer: Layer::Frame,
            kind: MarkerKind::NorthArrow,
            position: fl.north_arrow_anchor(vertex),
            size: fl.frame.height() * 0.05,
        });
    }

    for (rect, footer) in fl
        .footer_boxes(core.footers.len())
        .into_iter()
        .zip(&core.footers)
    {
        primitives.push(Primitive::Polyline {
            layer: Layer::Footer,
            points: FrameLayout::corners(rect),
            closed: true,
        });
        primitives.push(Primitive::MText {
            layer: Layer::Footer,
            content: markup::to_drawing_markup(footer),
            position: Point::new(rect.center().x, rect.y1),
            width: rect.width() * 0.9,
            char_height: core.footer_scale,
        });
    }
}

fn underlined_title(core: &PlanCore) -> String {
    format!(
        "{}{}{}",
        markup::UNDERLINE_START,
        markup::to_drawing_markup(&core.title),
        markup::UNDERLINE_STOP
    )
}

// ── Drawing scale ────────────────────────────────────────

/// Multiply every emitted coordinate and size by the drawing scale
/// (drawing unit = 1000 / plan scale), exactly once, at the end.
fn apply_drawing_scale(layout: &mut LayoutPlan, s: f64) {
    for primitive in &mut layout.primitives {
        scale_primitive(primitive, s);
    }
    if let Some(tb) = &mut layout.title_block {
        tb.anchor = (tb.anchor.to_vec2() * s).to_point();
        tb.width *= s;
        tb.char_height *= s;
        tb.annotation_height *= s;
        if let Some(len) = &mut tb.scale_bar_length {
            *len *= s;
        }
    }
}

fn scale_primitive(primitive: &mut Primitive, s: f64) {
    let scale_pt = |p: &mut Point| *p = (p.to_vec2() * s).to_point();
    match primitive {
        Primitive::Polyline { points, .. } => points.iter_mut().for_each(scale_pt),
        Primitive::Text {
            position, height, ..
        } => {
            scale_pt(position);
            *height *= s;
        }
        Primitive::MText {
            position,
            width,
            char_height,
            ..
        } => {
            scale_pt(position);
            *width *= s;
            *char_height *= s;
        }
        Primitive::Marker { position, size, .. } => {
            scale_pt(position);
            *size *= s;
        }
        Primitive::ScaleBar { position, length } => {
            scale_pt(position);
            *length *= s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingSurface;

    fn cadastral_json() -> &'static str {
        r#"{
            "name": "parcel test",
            "kind": "cadastral",
            "title": "<p>PLAN OF SURVEY</p><p><strong>LOT 4</strong></p>",
            "scale": 1000,
            "beacon_style": "box",
            "footers": ["<p>SURVEYED BY A. N. OTHER</p>", "<p>SHEET 1 OF 1</p>"],
            "coordinates": [
                {"id": "B1", "easting": 0.0, "northing": 0.0},
                {"id": "B2", "easting": 100.0, "northing": 0.0},
                {"id": "B3", "easting": 100.0, "northing": 80.0},
                {"id": "B4", "easting": 0.0, "northing": 80.0}
            ],
            "parcels": [{
                "name": "LOT 4",
                "ids": ["B1", "B2", "B3", "B4", "GHOST"],
                "legs": [
                    {"from": "B1", "to": "B2", "distance": 100.0,
                     "bearing": {"degrees": 90, "minutes": 0}},
                    {"from": "B2", "to": "MISSING", "distance": 80.0,
                     "bearing": {"degrees": 0, "minutes": 0}}
                ]
            }]
        }"#
    }

    fn topographic_json(n_coords: usize) -> String {
        // 4x3 lattice, elevation ramps with easting: z = 10 + 1.1 per column,
        // so whole-metre contour levels fall strictly between sample columns.
        let coords: Vec<String> = (0..n_coords)
            .map(|i| {
                let x = (i % 4) * 25;
                let y = (i / 4) * 25;
                let z = 10.0 + (i % 4) as f64 * 1.1;
                format!(
                    r#"{{"id": "T{i}", "easting": {x}.0, "northing": {y}.0, "elevation": {z:.1}}}"#
                )
            })
            .collect();
        format!(
            r#"{{
                "name": "topo test",
                "kind": "topographic",
                "title": "<p>TOPOGRAPHIC PLAN</p>",
                "scale": 1000,
                "beacon_style": "circle",
                "coordinates": [{}],
                "boundary": {{"ids": ["T0", "T3", "T11", "T8"], "legs": []}},
                "settings": {{"contour_interval": 1.0, "major_contour": 2.0,
                              "minimum_distance": 0.0, "surface": "tin"}}
            }}"#,
            coords.join(",")
        )
    }

    fn draw(plan: &Plan) -> (LayoutPlan, RecordingSurface) {
        let layout = derive_layout(plan).unwrap();
        let mut surface = RecordingSurface::new();
        render(&layout, &mut surface).unwrap();
        (layout, surface)
    }

    #[test]
    fn empty_coordinate_set_is_a_data_error() {
        let plan: Plan =
            serde_json::from_str(r#"{"name": "x", "kind": "cadastral", "coordinates": []}"#)
                .unwrap();
        assert!(matches!(derive_layout(&plan), Err(PlanError::Data(_))));
    }

    #[test]
    fn cadastral_layout_emits_expected_layers() {
        let plan: Plan = serde_json::from_str(cadastral_json()).unwrap();
        let (layout, surface) = draw(&plan);

        // unresolved parcel vertex and leg endpoint are observable
        assert_eq!(
            layout.skipped_ids,
            vec!["GHOST".to_string(), "MISSING".to_string()]
        );

        assert_eq!(surface.on_layer(Layer::Beacons).len(), 4);
        let parcels = surface.on_layer(Layer::Parcels);
        assert_eq!(parcels.len(), 1);
        assert!(matches!(
            parcels[0],
            Primitive::Polyline { closed: true, points, .. } if points.len() == 4
        ));
        // outer + offset frames
        assert_eq!(surface.on_layer(Layer::Frame).len(), 3); // 2 frames + north arrow
        // two footer boxes with their text
        assert_eq!(surface.on_layer(Layer::Footer).len(), 4);
        // one resolvable leg: distance + degrees + minutes,
        // plus 4 beacon ids and the parcel name
        assert_eq!(surface.on_layer(Layer::Labels).len(), 8);
        // title block: title mtext only (no scale bar for cadastral)
        assert_eq!(surface.on_layer(Layer::TitleBlock).len(), 1);
    }

    #[test]
    fn title_block_protocol_stacks_measured_boxes() {
        let plan: Plan = serde_json::from_str(&topographic_json(12)).unwrap();
        let (_, surface) = draw(&plan);

        let tb = surface.on_layer(Layer::TitleBlock);
        // title mtext, scale bar, origin and area annotations
        assert_eq!(tb.len(), 4);
        assert!(matches!(tb[0], Primitive::MText { .. }));
        assert!(matches!(tb[1], Primitive::ScaleBar { .. }));
        assert!(matches!(tb[2], Primitive::Text { content, .. } if content.starts_with("ORIGIN :- ")));
        assert!(matches!(tb[3], Primitive::Text { content, .. } if content.starts_with("AREA :- ")));

        let title_box = crate::render::estimated_extent(tb[0]);
        let bar_box = crate::render::estimated_extent(tb[1]);
        let origin_box = crate::render::estimated_extent(tb[2]);
        let area_box = crate::render::estimated_extent(tb[3]);
        // each dependent element sits strictly below the previous measured box
        assert!(bar_box.y1 < title_box.y0 + 1e-9);
        assert!(origin_box.y1 < bar_box.y0 + 1e-9);
        assert!(area_box.y1 < origin_box.y0 + 1e-9);
        // scale bar centered under the title
        assert!((bar_box.center().x - title_box.center().x).abs() < 1e-9);
    }

    #[test]
    fn topographic_layout_with_boundary_area_annotation() {
        let mut json = topographic_json(12);
        // add a footer so both kinds exercise the tiling
        json = json.replace(
            r#""boundary""#,
            r#""footers": ["<p>NOTES</p>"], "boundary""#,
        );
        let plan: Plan = serde_json::from_str(&json).unwrap();
        let layout = derive_layout(&plan).unwrap();
        let tb = layout.title_block.as_ref().unwrap();
        assert_eq!(tb.annotations.len(), 2);
        assert!(tb.annotations[0].starts_with("ORIGIN :- UTM"));
        assert!(tb.annotations[1].starts_with("AREA :- "));
        assert!(tb.scale_bar_length.is_some());
    }

    #[test]
    fn too_few_samples_skips_contours_but_keeps_the_drawing() {
        let plan: Plan = serde_json::from_str(&topographic_json(2)).unwrap();
        let (_, surface) = draw(&plan);
        assert!(surface.on_layer(Layer::ContourMajor).is_empty());
        assert!(surface.on_layer(Layer::ContourMinor).is_empty());
        // frame, boundary beacons and spot heights still render
        assert!(!surface.on_layer(Layer::Frame).is_empty());
        assert!(!surface.on_layer(Layer::SpotHeights).is_empty());
    }

    #[test]
    fn spot_height_marker_size_follows_the_point_label_scale() {
        let plan: Plan = serde_json::from_str(&topographic_json(12)).unwrap();
        let layout = derive_layout(&plan).unwrap();
        // scale 1000 → drawing factor 1, default point_label_scale 1
        let size = layout
            .primitives
            .iter()
            .find_map(|p| match p {
                Primitive::Marker {
                    layer: Layer::SpotHeights,
                    size,
                    ..
                } => Some(*size),
                _ => None,
            })
            .expect("spot-height marker");
        assert!((size - 0.1).abs() < 1e-9);
    }

    #[test]
    fn contours_render_with_labels_on_major_lines() {
        let plan: Plan = serde_json::from_str(&topographic_json(12)).unwrap();
        let (_, surface) = draw(&plan);
        // elevations span 10.0..13.3: levels 11..=13 cross the terrain,
        // 12 is the only multiple of the major interval
        assert!(!surface.on_layer(Layer::ContourMajor).is_empty());
        assert!(!surface.on_layer(Layer::ContourMinor).is_empty());
        let labels = surface.on_layer(Layer::ContourLabels);
        assert!(!labels.is_empty());
        for label in labels {
            match label {
                Primitive::Text { content, .. } => assert_eq!(content.as_str(), "12.0"),
                other => panic!("unexpected contour label {other:?}"),
            }
        }
    }

    #[test]
    fn drawing_scale_multiplies_all_coordinates() {
        let json = cadastral_json().replace(r#""scale": 1000"#, r#""scale": 500"#);
        let plan: Plan = serde_json::from_str(&json).unwrap();
        let layout = derive_layout(&plan).unwrap();
        // scale 500 → drawing unit factor 2: beacon B2 lands at (200, 0)
        let beacon = layout
            .primitives
            .iter()
            .find_map(|p| match p {
                Primitive::Marker {
                    layer: Layer::Beacons,
                    position,
                    ..
                } if (position.x - 200.0).abs() < 1e-9 => Some(*position),
                _ => None,
            })
            .expect("scaled beacon");
        assert!((beacon.y - 0.0).abs() < 1e-9);
    }

    #[test]
    fn identical_plans_produce_identical_emission_sequences() {
        let plan: Plan = serde_json::from_str(&topographic_json(12)).unwrap();
        let (_, first) = draw(&plan);
        let (_, second) = draw(&plan);
        assert_eq!(first.placed, second.placed);
    }
}
