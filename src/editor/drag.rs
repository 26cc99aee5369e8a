//! Drag operations
//!
//! A drag moves an element's facsimile anchor by a display-space delta
//! (positive y is up) and keeps the symbolic layer consistent with the new
//! position: pitched elements snap to whole diatonic steps, clefs snap to
//! staff lines, and anything whose governing clef changed as a result is
//! re-pitched to hold its drawn position.

use log::debug;

use crate::errors::EditError;
use crate::geometry::{lines_for_drag, steps_for_drag};
use crate::models::{Document, ElementId, ElementKind, StaffMetrics};

use super::actions::DragParam;
use super::clefs;

/// Result of a drag: an info string plus, inside a chain, the layer whose
/// sibling order still needs restoring.
pub struct DragOutcome {
    pub info: String,
    pub deferred_reorder: Option<ElementId>,
}

pub fn drag(doc: &mut Document, param: &DragParam, in_chain: bool) -> Result<DragOutcome, EditError> {
    let kind = doc
        .kind_of(&param.element_id)
        .ok_or_else(|| EditError::NotFound(param.element_id.clone()))?;
    match kind {
        ElementKind::Staff => drag_staff(doc, param),
        ElementKind::Clef => drag_clef(doc, param, in_chain),
        ElementKind::Nc | ElementKind::Custos | ElementKind::Neume | ElementKind::Syllable => {
            drag_pitched(doc, param, in_chain)
        }
        ElementKind::Syl => drag_syl(doc, param),
        other => Err(EditError::Unsupported(format!(
            "cannot drag an element of class {:?}",
            other
        ))),
    }
}

/// Move a whole staff: every zone in its subtree shifts by the raw delta.
/// Pitches and sequence order are untouched; governance is scoped to the
/// staff's own layer and moves with it.
fn drag_staff(doc: &mut Document, param: &DragParam) -> Result<DragOutcome, EditError> {
    shift_zones(doc, &param.element_id, param.x, param.y);
    Ok(DragOutcome {
        info: format!("dragged staff {}", param.element_id),
        deferred_reorder: None,
    })
}

/// Move a clef: the vertical delta snaps to whole staff lines, the clef's
/// line number follows, and every element whose governor changed (or whose
/// governor's line changed) is re-pitched.
fn drag_clef(
    doc: &mut Document,
    param: &DragParam,
    in_chain: bool,
) -> Result<DragOutcome, EditError> {
    let metrics = metrics_for(doc, &param.element_id)?;
    let line_diff = lines_for_drag(param.y, metrics);

    let before = clefs::governance(doc);
    shift_zones(doc, &param.element_id, param.x, line_diff * 2 * metrics.unit);
    if let Some(clef) = doc
        .get_mut(&param.element_id)
        .and_then(|el| el.clef.as_mut())
    {
        clef.line += line_diff;
    }

    let layer = layer_for(doc, &param.element_id)?;
    let order = doc.preorder_with_layer_sorted(&layer);
    let adjusted = clefs::reconcile(doc, &before, &order);
    debug!("clef drag re-pitched {} elements", adjusted);

    let deferred = finish_reorder(doc, &layer, in_chain);
    Ok(DragOutcome {
        info: format!(
            "dragged clef {} by {} lines",
            param.element_id, line_diff
        ),
        deferred_reorder: deferred,
    })
}

/// Move a pitched element or a grouping of them. The vertical delta snaps to
/// whole diatonic steps; zones shift by the snapped amount so pitch and
/// position stay in lockstep. Crossing a clef boundary re-pitches whatever
/// changed governor, the dragged elements included.
fn drag_pitched(
    doc: &mut Document,
    param: &DragParam,
    in_chain: bool,
) -> Result<DragOutcome, EditError> {
    let metrics = metrics_for(doc, &param.element_id)?;
    let steps = steps_for_drag(param.y, metrics);

    let before = clefs::governance(doc);
    shift_zones(doc, &param.element_id, param.x, steps * metrics.unit);
    for id in pitched_targets(doc, &param.element_id) {
        if let Some(pitch) = doc.get_mut(&id).and_then(|el| el.pitch.as_mut()) {
            pitch.adjust_by_offset(steps);
        }
    }

    let layer = layer_for(doc, &param.element_id)?;
    let order = doc.preorder_with_layer_sorted(&layer);
    let adjusted = clefs::reconcile(doc, &before, &order);
    debug!("drag re-pitched {} elements across clef boundaries", adjusted);

    let deferred = finish_reorder(doc, &layer, in_chain);
    Ok(DragOutcome {
        info: format!("dragged {} by {} steps", param.element_id, steps),
        deferred_reorder: deferred,
    })
}

/// Move a syllable text box freely; no symbolic state depends on it.
fn drag_syl(doc: &mut Document, param: &DragParam) -> Result<DragOutcome, EditError> {
    let zone_id = doc
        .get(&param.element_id)
        .and_then(|el| el.zone.clone())
        .ok_or_else(|| {
            EditError::Precondition(format!("{} has no facsimile zone", param.element_id))
        })?;
    if let Some(zone) = doc.surface.get_mut(&zone_id) {
        zone.shift_by_xy(param.x, param.y);
    }
    Ok(DragOutcome {
        info: format!("dragged syl {}", param.element_id),
        deferred_reorder: None,
    })
}

/// Shift every zone referenced in a subtree once, shared ligature zones
/// included exactly once.
fn shift_zones(doc: &mut Document, id: &str, dx: i32, dy: i32) {
    for zone_id in doc.zones_in_subtree(id) {
        if let Some(zone) = doc.surface.get_mut(&zone_id) {
            zone.shift_by_xy(dx, dy);
        }
    }
}

/// The pitched elements a drag applies to: the element itself when pitched,
/// otherwise its pitched descendants.
fn pitched_targets(doc: &Document, id: &str) -> Vec<ElementId> {
    if clefs::is_pitched(doc, id) {
        return vec![id.to_string()];
    }
    let mut targets = doc.descendants_of_kind(id, ElementKind::Nc);
    targets.extend(doc.descendants_of_kind(id, ElementKind::Custos));
    targets
}

fn metrics_for(doc: &Document, id: &str) -> Result<StaffMetrics, EditError> {
    let staff = doc
        .staff_of(id)
        .ok_or_else(|| EditError::Precondition(format!("{} is not on a staff", id)))?;
    doc.staff_metrics(&staff)
        .ok_or_else(|| EditError::Precondition(format!("staff {} has no metrics", staff)))
}

fn layer_for(doc: &Document, id: &str) -> Result<ElementId, EditError> {
    doc.layer_of(id)
        .ok_or_else(|| EditError::Precondition(format!("{} is not in a layer", id)))
}

fn finish_reorder(doc: &mut Document, layer: &str, in_chain: bool) -> Option<ElementId> {
    if in_chain {
        Some(layer.to_string())
    } else {
        doc.reorder_children_by_x(layer);
        None
    }
}
