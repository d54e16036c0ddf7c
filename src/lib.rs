//! plan2dxf: survey plan description → layered CAD drawing.
//!
//! Takes a cadastral or topographic plan (coordinates, parcels, traverse
//! legs, terrain settings) and derives a complete sheet: beacons and
//! labels, distance/bearing annotations, contour lines, frames, title
//! block and footers, emitted through a pluggable drawing backend.
//!
//! # Example
//!
//! ```no_run
//! use plan2dxf::{derive_layout, render, DxfSurface, Plan};
//! use std::path::Path;
//!
//! let plan: Plan = serde_json::from_str(r#"{"name": "lot 7", "kind": "cadastral",
//!     "coordinates": [{"id": "B1", "easting": 0.0, "northing": 0.0}]}"#)?;
//! let layout = derive_layout(&plan)?;
//! let mut surface = DxfSurface::new();
//! render(&layout, &mut surface)?;
//! surface.save(Path::new("lot7.dxf"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]

mod frame;
mod geom;
mod index;
mod labels;
mod markup;

pub mod contour;
pub mod error;
pub mod export;
pub mod layout;
pub mod model;
pub mod render;
pub mod terrain;

// Re-export kurbo so downstream users get the same version used by
// Primitive coordinates.
pub use kurbo;

pub use error::PlanError;
pub use export::DxfSurface;
pub use layout::{derive_layout, render, LayoutPlan, TitleBlock};
pub use model::{Plan, PlanKind};
pub use render::{DrawSurface, Layer, MarkerKind, Primitive, RecordingSurface, TextAlign};
