//! Input data model for a plan-generation request.
//!
//! Deserialized once per request; everything here is read-only for the
//! lifetime of the request and nothing survives across requests.

use serde::Deserialize;

use crate::error::PlanError;

/// A survey point. Identifiers are unique within a plan; duplicates are
/// detected by the coordinate index, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct Coordinate {
    pub id: String,
    pub easting: f64,
    pub northing: f64,
    /// Spot elevation. Only meaningful for topographic plans.
    #[serde(default)]
    pub elevation: f64,
}

/// Surveyor bearing: degrees/minutes/seconds from true North, clockwise.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Bearing {
    pub degrees: u32,
    pub minutes: u32,
    #[serde(default)]
    pub seconds: f64,
}

impl Bearing {
    /// Decimal-degree value of the bearing.
    pub fn decimal(&self) -> f64 {
        self.degrees as f64 + self.minutes as f64 / 60.0 + self.seconds / 3600.0
    }
}

/// One edge of a parcel/boundary traverse.
#[derive(Debug, Clone, Deserialize)]
pub struct TraverseLeg {
    pub from: String,
    pub to: String,
    pub bearing: Bearing,
    #[serde(default)]
    pub observed_angle: Option<f64>,
    pub distance: f64,
}

/// A closed polygon of survey points: a parcel on cadastral plans, the
/// survey limit boundary on topographic plans.
#[derive(Debug, Clone, Deserialize)]
pub struct ParcelDef {
    #[serde(default)]
    pub name: String,
    pub ids: Vec<String>,
    #[serde(default)]
    pub legs: Vec<TraverseLeg>,
}

/// Beacon marker symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BeaconStyle {
    Dot,
    Circle,
    Box,
    #[default]
    None,
}

/// Which terrain-surface strategy feeds the contour extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceMode {
    #[default]
    Tin,
    Grid,
}

/// Per-layer visibility toggles for topographic output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayerVisibility {
    pub spot_heights: bool,
    pub contours: bool,
    pub contour_labels: bool,
    pub boundary: bool,
    pub mesh: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            spot_heights: true,
            contours: true,
            contour_labels: true,
            boundary: true,
            mesh: false,
        }
    }
}

/// Topographic settings block.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopographicSettings {
    /// Vertical spacing between iso-elevation lines, in metres.
    pub contour_interval: f64,
    /// Multiple of the interval at which a contour is emphasized.
    pub major_contour: f64,
    /// Minimum spacing between kept contour points, in metres.
    pub minimum_distance: f64,
    pub surface: SurfaceMode,
    /// Lattice resolution per axis for grid-mode resampling.
    pub grid_resolution: usize,
    /// Gaussian smoothing sigma (lattice cells) for grid mode. 0 = off.
    pub smoothing: f64,
    pub point_label_scale: f64,
    pub contour_label_scale: f64,
    pub visibility: LayerVisibility,
}

impl Default for TopographicSettings {
    fn default() -> Self {
        Self {
            contour_interval: 1.0,
            major_contour: 5.0,
            minimum_distance: 0.5,
            surface: SurfaceMode::Tin,
            grid_resolution: 100,
            smoothing: 1.2,
            point_label_scale: 1.0,
            contour_label_scale: 1.0,
            visibility: LayerVisibility::default(),
        }
    }
}

/// Fields shared by every plan kind.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanCore {
    pub name: String,
    /// Rich-text title, translated by [`crate::markup`] before placement.
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Survey-to-drawing ratio; drawing unit = 1000 / scale.
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_unit")]
    pub label_scale: f64,
    #[serde(default = "default_unit")]
    pub footer_scale: f64,
    #[serde(default)]
    pub beacon_style: BeaconStyle,
    #[serde(default = "default_unit")]
    pub beacon_size: f64,
    #[serde(default)]
    pub footers: Vec<String>,
    pub coordinates: Vec<Coordinate>,
}

fn default_origin() -> String {
    "utm_zone_31".to_string()
}

fn default_scale() -> f64 {
    1.0
}

fn default_font() -> String {
    "Arial".to_string()
}

fn default_font_size() -> f64 {
    12.0
}

fn default_unit() -> f64 {
    1.0
}

/// Cadastral-specific data: parcel polygons with their traverse legs.
#[derive(Debug, Clone, Deserialize)]
pub struct CadastralData {
    #[serde(default)]
    pub parcels: Vec<ParcelDef>,
}

/// Topographic-specific data: optional survey-limit boundary plus settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TopographicData {
    #[serde(default)]
    pub boundary: Option<ParcelDef>,
    #[serde(default)]
    pub settings: TopographicSettings,
}

/// Plan kind, dispatched exhaustively by the layout engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlanKind {
    Cadastral(CadastralData),
    Topographic(TopographicData),
}

/// A complete plan description, as handed over by the API layer.
#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    #[serde(flatten)]
    pub core: PlanCore,
    #[serde(flatten)]
    pub kind: PlanKind,
}

impl Plan {
    /// Drawing unit per survey metre.
    pub fn drawing_scale(&self) -> f64 {
        1000.0 / self.core.scale
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if !(self.core.scale > 0.0) {
            return Err(PlanError::Validation(format!(
                "scale must be positive, got {}",
                self.core.scale
            )));
        }
        if let PlanKind::Topographic(data) = &self.kind {
            let s = &data.settings;
            if !(s.contour_interval > 0.0) {
                return Err(PlanError::Validation(format!(
                    "contour interval must be positive, got {}",
                    s.contour_interval
                )));
            }
            if !(s.major_contour > 0.0) {
                return Err(PlanError::Validation(format!(
                    "major contour multiple must be positive, got {}",
                    s.major_contour
                )));
            }
            if s.minimum_distance < 0.0 {
                return Err(PlanError::Validation(
                    "minimum point spacing must not be negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearing_decimal() {
        let b = Bearing {
            degrees: 45,
            minutes: 30,
            seconds: 0.0,
        };
        assert!((b.decimal() - 45.5).abs() < 1e-12);
    }

    #[test]
    fn deserialize_topographic_plan() {
        let json = r#"{
            "name": "lot 7",
            "kind": "topographic",
            "scale": 500,
            "coordinates": [
                {"id": "T1", "easting": 100.0, "northing": 200.0, "elevation": 12.3}
            ],
            "boundary": {"ids": ["T1"], "legs": []},
            "settings": {"contour_interval": 0.5, "surface": "grid"}
        }"#;
        let plan: Plan = serde_json::from_str(json).unwrap();
        assert!((plan.drawing_scale() - 2.0).abs() < 1e-12);
        match &plan.kind {
            PlanKind::Topographic(data) => {
                assert_eq!(data.settings.surface, SurfaceMode::Grid);
                assert!((data.settings.contour_interval - 0.5).abs() < 1e-12);
                // untouched fields keep their defaults
                assert!((data.settings.major_contour - 5.0).abs() < 1e-12);
            }
            _ => panic!("expected topographic kind"),
        }
    }

    #[test]
    fn unknown_kind_tag_is_rejected() {
        let json = r#"{"name": "x", "kind": "route", "coordinates": []}"#;
        assert!(serde_json::from_str::<Plan>(json).is_err());
    }

    #[test]
    fn zero_scale_fails_validation() {
        let json = r#"{"name": "x", "kind": "cadastral", "scale": 0, "coordinates": []}"#;
        let plan: Plan = serde_json::from_str(json).unwrap();
        assert!(matches!(plan.validate(), Err(PlanError::Validation(_))));
    }
}
