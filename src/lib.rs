//! Structural editing engine for neume-notation documents anchored to
//! facsimile images.
//!
//! The document is a tree of elements (staves, layers, syllables, neumes,
//! note components, clefs) whose leaves are anchored to rectangular zones of
//! a source image. Edits arrive as JSON actions and keep two invariants in
//! lockstep: sibling order always matches the left-to-right order of the
//! anchoring zones, and every pitched element's drawn position is preserved
//! whenever the clef governing it changes.
//!
//! ```
//! use neume_editor::{Editor, EditorAction};
//!
//! let mut editor = Editor::new();
//! let report = editor.apply_json(
//!     r#"{"action": "insert", "param": {
//!         "elementType": "staff", "ulx": 0, "uly": 0, "lrx": 4000, "lry": 600
//!     }}"#,
//! ).unwrap();
//! assert!(report.success);
//! ```

pub mod editor;
pub mod errors;
pub mod geometry;
pub mod models;

pub use editor::{EditReport, Editor, EditorAction, EditorOptions};
pub use errors::{EditError, EditResult};
pub use models::{
    ClefData, ClefShape, Document, Element, ElementId, ElementKind, Pitch, StaffMetrics, Surface,
    Zone, ZoneId,
};
