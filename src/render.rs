//! Drawing primitives, the layer/style convention, and the renderer seam.
//!
//! The engine never draws; it emits [`Primitive`]s through a [`DrawSurface`].
//! Every placement reports back the rendered bounding box so dependent
//! elements (title block, scale bar, annotations) can be positioned without
//! hardcoding renderer-specific text metrics.

use kurbo::{Point, Rect};

use crate::error::PlanError;

/// Output layers with the fixed style convention: name, DXF color index,
/// and relative line weight (hundredths of a millimetre).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Beacons,
    Parcels,
    Boundary,
    Labels,
    Frame,
    TitleBlock,
    Footer,
    ContourMajor,
    ContourMinor,
    ContourLabels,
    TinMesh,
    GridMesh,
    SpotHeights,
}

impl Layer {
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Beacons => "BEACONS",
            Layer::Parcels => "PARCELS",
            Layer::Boundary => "BOUNDARY",
            Layer::Labels => "LABELS",
            Layer::Frame => "FRAME",
            Layer::TitleBlock => "TITLE_BLOCK",
            Layer::Footer => "FOOTER",
            Layer::ContourMajor => "CONTOUR_MAJOR",
            Layer::ContourMinor => "CONTOUR_MINOR",
            Layer::ContourLabels => "CONTOUR_LABELS",
            Layer::TinMesh => "TIN_MESH",
            Layer::GridMesh => "GRID_MESH",
            Layer::SpotHeights => "SPOT_HEIGHTS",
        }
    }

    /// AutoCAD color index. 7 = black/white, 1 = red, 8/9 = grays,
    /// 34 = brown, 30 = orange.
    pub fn color(&self) -> u8 {
        match self {
            Layer::Beacons | Layer::Labels | Layer::Frame | Layer::TitleBlock | Layer::Footer => 7,
            Layer::Parcels | Layer::Boundary => 1,
            Layer::ContourMajor | Layer::ContourMinor | Layer::ContourLabels => 34,
            Layer::TinMesh => 8,
            Layer::GridMesh => 9,
            Layer::SpotHeights => 30,
        }
    }

    /// Line weight class; major contours draw heavier than minor ones.
    pub fn line_weight(&self) -> u8 {
        match self {
            Layer::ContourMajor => 50,
            Layer::ContourMinor => 25,
            Layer::TinMesh | Layer::GridMesh => 10,
            _ => 25,
        }
    }

    /// Reference meshes draw dotted; everything else solid.
    pub fn dotted(&self) -> bool {
        matches!(self, Layer::GridMesh)
    }
}

/// Point-symbol variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Dot,
    Circle,
    Box,
    Cross,
    NorthArrow,
}

/// Horizontal/vertical anchoring of single-line text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    BottomLeft,
    MiddleCenter,
}

/// A tagged drawing primitive. All coordinates are in drawing units
/// (survey metres already multiplied by the drawing scale).
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Polyline {
        layer: Layer,
        points: Vec<Point>,
        closed: bool,
    },
    Text {
        layer: Layer,
        content: String,
        position: Point,
        height: f64,
        rotation: f64,
        align: TextAlign,
    },
    /// Width-constrained multi-line text anchored top-center.
    /// Content uses the drawing-markup directives from [`crate::markup`].
    MText {
        layer: Layer,
        content: String,
        position: Point,
        width: f64,
        char_height: f64,
    },
    Marker {
        layer: Layer,
        kind: MarkerKind,
        position: Point,
        size: f64,
    },
    /// Graphical scale bar centered on `position`.
    ScaleBar { position: Point, length: f64 },
}

/// The renderer seam: place one primitive, report its rendered extent.
///
/// Implementations must be deterministic for identical input sequences.
pub trait DrawSurface {
    fn place(&mut self, primitive: &Primitive) -> Result<Rect, PlanError>;
}

/// Average glyph advance as a fraction of text height. Shared by the
/// recording surface and the DXF backend so measured-placement layout is
/// consistent across both.
pub const GLYPH_ASPECT: f64 = 0.6;

/// Line spacing factor for width-constrained multi-line text.
pub const MTEXT_LINE_SPACING: f64 = 1.67;

/// Estimate the extent of placed text without a font engine.
pub fn text_extent(content: &str, height: f64) -> (f64, f64) {
    let chars = content.chars().count().max(1) as f64;
    (chars * height * GLYPH_ASPECT, height)
}

/// Estimate the extent of width-constrained multi-line text. Explicit line
/// breaks (`\P`) and wrapping both contribute lines.
pub fn mtext_extent(content: &str, width: f64, char_height: f64) -> (f64, f64) {
    let chars_per_line = ((width / (char_height * GLYPH_ASPECT)).floor() as usize).max(1);
    let mut lines = 0usize;
    for line in content.split("\\P") {
        let stripped = strip_directives(line);
        let n = stripped.chars().count();
        lines += (n / chars_per_line) + 1;
    }
    (width, lines as f64 * char_height * MTEXT_LINE_SPACING)
}

/// Drop formatting directives so they don't count towards wrapping.
fn strip_directives(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                // one-letter code, e.g. \L, \l
                chars.next();
            }
            '{' | '}' => {}
            ';' => {}
            _ => out.push(c),
        }
    }
    out
}

/// A renderer stub that records every placed primitive and answers with
/// deterministic estimated bounding boxes. Backs the unit tests and the
/// CLI dry-run mode.
#[derive(Default)]
pub struct RecordingSurface {
    pub placed: Vec<Primitive>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primitives on a given layer, in emission order.
    pub fn on_layer(&self, layer: Layer) -> Vec<&Primitive> {
        self.placed
            .iter()
            .filter(|p| primitive_layer(p) == layer)
            .collect()
    }
}

pub fn primitive_layer(p: &Primitive) -> Layer {
    match p {
        Primitive::Polyline { layer, .. }
        | Primitive::Text { layer, .. }
        | Primitive::MText { layer, .. }
        | Primitive::Marker { layer, .. } => *layer,
        Primitive::ScaleBar { .. } => Layer::TitleBlock,
    }
}

/// Bounding box a faithful renderer would report for a primitive.
pub fn estimated_extent(primitive: &Primitive) -> Rect {
    match primitive {
        Primitive::Polyline { points, .. } => {
            let mut rect = Rect::new(0.0, 0.0, 0.0, 0.0);
            if let Some(first) = points.first() {
                rect = Rect::from_points(*first, *first);
                for p in &points[1..] {
                    rect = rect.union_pt(*p);
                }
            }
            rect
        }
        Primitive::Text {
            content,
            position,
            height,
            align,
            ..
        } => {
            let (w, h) = text_extent(content, *height);
            match align {
                TextAlign::BottomLeft => Rect::new(
                    position.x,
                    position.y,
                    position.x + w,
                    position.y + h,
                ),
                TextAlign::MiddleCenter => Rect::new(
                    position.x - w / 2.0,
                    position.y - h / 2.0,
                    position.x + w / 2.0,
                    position.y + h / 2.0,
                ),
            }
        }
        Primitive::MText {
            content,
            position,
            width,
            char_height,
            ..
        } => {
            let (w, h) = mtext_extent(content, *width, *char_height);
            Rect::new(
                position.x - w / 2.0,
                position.y - h,
                position.x + w / 2.0,
                position.y,
            )
        }
        Primitive::Marker { position, size, .. } => Rect::new(
            position.x - size / 2.0,
            position.y - size / 2.0,
            position.x + size / 2.0,
            position.y + size / 2.0,
        ),
        Primitive::ScaleBar { position, length } => {
            let h = length * 0.04;
            Rect::new(
                position.x - length / 2.0,
                position.y - h,
                position.x + length / 2.0,
                position.y,
            )
        }
    }
}

impl DrawSurface for RecordingSurface {
    fn place(&mut self, primitive: &Primitive) -> Result<Rect, PlanError> {
        let rect = estimated_extent(primitive);
        self.placed.push(primitive.clone());
        Ok(rect)
    }
}
