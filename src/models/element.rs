//! Element types for the neume-notation document tree
//!
//! Every node in the document is an `Element`: a class tag plus the
//! capabilities that class opts into. Capabilities are modeled as optional
//! payloads populated by the constructor, so "does this element bear a
//! pitch?" is a plain `element.pitch.is_some()` query rather than a class
//! hierarchy walk.

use serde::{Deserialize, Serialize};

use super::facsimile::ZoneId;
use super::pitch::Pitch;

/// Identifier of an element within its document.
pub type ElementId = String;

/// Class tag of a document element.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    /// Page root; owns the staves
    Page,
    /// A staff on the page, carrying its drawing metrics
    Staff,
    /// The single ordered voice of a staff
    Layer,
    /// Text-bearing grouping of neumes
    Syllable,
    /// Grouping of note components rendered as one glyph combination
    Neume,
    /// Atomic pitched note component
    Nc,
    /// Clef; governs how following pitches map to vertical positions
    Clef,
    /// End-of-line pitch reminder, pitched like a note component
    Custos,
    /// Syllable text holder with its own bounding box
    Syl,
    /// Raw text content inside a Syl
    Text,
}

impl ElementKind {
    /// Identifier prefix for elements of this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            ElementKind::Page => "page",
            ElementKind::Staff => "staff",
            ElementKind::Layer => "layer",
            ElementKind::Syllable => "syllable",
            ElementKind::Neume => "neume",
            ElementKind::Nc => "nc",
            ElementKind::Clef => "clef",
            ElementKind::Custos => "custos",
            ElementKind::Syl => "syl",
            ElementKind::Text => "text",
        }
    }
}

/// Shape of a clef, determining the baseline step of its line.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClefShape {
    C,
    F,
}

impl ClefShape {
    /// Diatonic step placed on the clef's line: c for a C clef, f for an F clef.
    pub fn baseline_step(&self) -> i32 {
        match self {
            ClefShape::C => 1,
            ClefShape::F => 4,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "C" => Some(ClefShape::C),
            "F" => Some(ClefShape::F),
            _ => None,
        }
    }
}

/// Shape and staff line of a clef. Copied freely; reassociation snapshots
/// these values before any mutation so transforms can reference the pre-edit
/// state.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClefData {
    pub shape: ClefShape,
    pub line: i32,
}

impl ClefData {
    pub fn new(shape: ClefShape, line: i32) -> Self {
        Self { shape, line }
    }
}

/// Per-staff drawing metrics, sourced from the staff definition.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaffMetrics {
    /// Drawing unit: half of one line spacing, the vertical size of one
    /// diatonic step
    pub unit: i32,
    /// Number of staff lines
    pub lines: i32,
    /// Clef assumed for elements not preceded by any clef element
    pub default_clef: ClefData,
}

impl StaffMetrics {
    pub fn new(unit: i32, lines: i32, default_clef: ClefData) -> Self {
        Self {
            unit,
            lines,
            default_clef,
        }
    }
}

/// A node of the document tree.
///
/// Ownership: the parent's `children` list owns the subtree; `parent` is a
/// non-owning back pointer. The `zone` field is a non-owning key into the
/// page `Surface`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Element {
    pub id: ElementId,
    pub kind: ElementKind,
    #[serde(default)]
    pub parent: Option<ElementId>,
    #[serde(default)]
    pub children: Vec<ElementId>,
    /// PitchBearing capability (note components and custodes)
    #[serde(default)]
    pub pitch: Option<Pitch>,
    /// FacsimileBearing capability: key of the anchoring zone, if any
    #[serde(default)]
    pub zone: Option<ZoneId>,
    /// Clef payload, present iff `kind == Clef`
    #[serde(default)]
    pub clef: Option<ClefData>,
    /// Staff metrics, present iff `kind == Staff`
    #[serde(default)]
    pub staff: Option<StaffMetrics>,
    /// Text content, present on Text elements
    #[serde(default)]
    pub text: Option<String>,
    /// Shared-rendering flag between two adjacent note components
    #[serde(default)]
    pub ligated: bool,
    /// Glyph tilt hint on note components (e.g. "n", "se")
    #[serde(default)]
    pub tilt: Option<String>,
}

impl Element {
    /// Create an element of the given kind with its class capabilities
    /// opted in: note components and custodes start with a default pitch,
    /// text elements with empty content.
    pub fn new(id: ElementId, kind: ElementKind) -> Self {
        let pitch = match kind {
            ElementKind::Nc | ElementKind::Custos => Some(Pitch::default()),
            _ => None,
        };
        let text = match kind {
            ElementKind::Text => Some(String::new()),
            _ => None,
        };
        Self {
            id,
            kind,
            parent: None,
            children: Vec::new(),
            pitch,
            zone: None,
            clef: None,
            staff: None,
            text,
            ligated: false,
            tilt: None,
        }
    }

    pub fn is(&self, kind: ElementKind) -> bool {
        self.kind == kind
    }

    /// Does this element expose the PitchBearing capability?
    pub fn has_pitch(&self) -> bool {
        self.pitch.is_some()
    }

    /// Does this element currently have a facsimile association?
    pub fn has_facs(&self) -> bool {
        self.zone.is_some()
    }
}
