//! Data model for facsimile-linked neume documents

pub mod document;
pub mod element;
pub mod facsimile;
pub mod pitch;

pub use document::Document;
pub use element::{ClefData, ClefShape, Element, ElementId, ElementKind, StaffMetrics};
pub use facsimile::{Surface, Zone, ZoneId};
pub use pitch::Pitch;
