//! Clef governance
//!
//! A pitched element is governed by the nearest preceding clef in its own
//! layer, or by the staff's default clef when no clef precedes it. Every
//! structural edit that can change which clef governs an element (moving or
//! removing a clef, dragging a note past one, reordering staves) must keep
//! the element's drawn position fixed by compensating its pitch.
//!
//! Rather than case-splitting on how the governance boundary moved, edits
//! snapshot the full governance map before mutating, recompute it after, and
//! shift each re-governed pitch by the step delta that leaves its vertical
//! offset unchanged. Snapshots copy clef data by value, so the order in
//! which an edit mutates clef fields and tree structure does not matter.

use std::collections::HashMap;

use crate::geometry::clef_change_delta;
use crate::models::{ClefData, Document, Element, ElementId, ElementKind};

/// Which clef data governs each pitched element, in a given document order.
pub type Governance = HashMap<ElementId, ClefData>;

/// Compute the governance map over an explicit document order.
pub fn governance_in_order(doc: &Document, order: &[ElementId]) -> Governance {
    let mut map = Governance::new();
    let mut current: Option<ClefData> = None;
    for id in order {
        let Some(el) = doc.get(id) else { continue };
        // Governance does not flow across layer boundaries.
        if el.is(ElementKind::Layer) {
            current = None;
            continue;
        }
        if el.is(ElementKind::Clef) {
            current = el.clef;
            continue;
        }
        if el.has_pitch() {
            let governor = current.or_else(|| default_clef_of(doc, id));
            if let Some(data) = governor {
                map.insert(id.clone(), data);
            }
        }
    }
    map
}

/// Governance map in the document's current order.
pub fn governance(doc: &Document) -> Governance {
    governance_in_order(doc, &doc.preorder())
}

/// The clef data that would govern an element at its current position.
pub fn governor_of(doc: &Document, id: &str, order: &[ElementId]) -> Option<ClefData> {
    let mut current: Option<ClefData> = None;
    for candidate in order {
        if candidate == id {
            return current.or_else(|| default_clef_of(doc, id));
        }
        if let Some(el) = doc.get(candidate) {
            if el.is(ElementKind::Layer) {
                current = None;
            } else if el.is(ElementKind::Clef) {
                current = el.clef;
            }
        }
    }
    None
}

/// Re-pitch every element whose governing clef changed relative to the
/// snapshot, preserving each element's vertical offset. Elements absent from
/// the snapshot (freshly inserted) are left alone. Returns how many pitches
/// were adjusted.
pub fn reconcile(doc: &mut Document, before: &Governance, order: &[ElementId]) -> usize {
    let after = governance_in_order(doc, order);
    let mut adjusted = 0;
    for (id, new_governor) in &after {
        let Some(old_governor) = before.get(id) else {
            continue;
        };
        let delta = clef_change_delta(*old_governor, *new_governor);
        if delta == 0 {
            continue;
        }
        if let Some(pitch) = doc.get_mut(id).and_then(|el| el.pitch.as_mut()) {
            pitch.adjust_by_offset(delta);
            adjusted += 1;
        }
    }
    adjusted
}

fn default_clef_of(doc: &Document, id: &str) -> Option<ClefData> {
    let staff = doc.staff_of(id)?;
    doc.staff_metrics(&staff).map(|metrics| metrics.default_clef)
}

/// Does this element bear a pitch? Convenience for operation preconditions.
pub fn is_pitched(doc: &Document, id: &str) -> bool {
    doc.get(id).map(Element::has_pitch).unwrap_or(false)
}
