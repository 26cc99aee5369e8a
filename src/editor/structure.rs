//! Structural edits: remove, resize, split, merge

use log::debug;

use crate::errors::{EditError, EditResult};
use crate::geometry::unit_from_height;
use crate::models::{Document, ElementId, ElementKind, ZoneId};

use super::actions::{ResizeParam, SplitParam};
use super::clefs;

/// Delete an element and its subtree. Removing the last note component of a
/// neume (or the last neume of a syllable) removes the emptied container as
/// well, and anything governed by a removed clef is re-pitched against the
/// clef that takes over.
pub fn remove(doc: &mut Document, id: &str) -> EditResult {
    let kind = doc
        .kind_of(id)
        .ok_or_else(|| EditError::NotFound(id.to_string()))?;
    if matches!(kind, ElementKind::Page | ElementKind::Layer) {
        return Err(EditError::Unsupported(format!(
            "cannot remove an element of class {:?}",
            kind
        )));
    }

    let before = clefs::governance(doc);
    let parent = doc.parent_of(id);
    let mut zones = doc.zones_in_subtree(id);
    doc.delete_subtree(id);

    // Prune containers the deletion emptied.
    if kind == ElementKind::Nc || kind == ElementKind::Neume {
        let mut candidate = parent;
        while let Some(container) = candidate {
            let container_kind = doc.kind_of(&container);
            let empty = match container_kind {
                Some(ElementKind::Neume) => {
                    doc.count_children_of_kind(&container, ElementKind::Nc) == 0
                }
                Some(ElementKind::Syllable) => {
                    doc.count_children_of_kind(&container, ElementKind::Neume) == 0
                }
                _ => false,
            };
            if !empty {
                break;
            }
            candidate = doc.parent_of(&container);
            zones.extend(doc.zones_in_subtree(&container));
            doc.delete_subtree(&container);
        }
    }

    collect_orphaned_zones(doc, zones);
    let order = doc.preorder();
    let adjusted = clefs::reconcile(doc, &before, &order);
    debug!("removal re-pitched {} elements", adjusted);
    Ok(format!("removed {}", id))
}

/// Resize a staff or syl bounding box. A staff resize also rescales the
/// staff's drawing unit from the new height.
pub fn resize(doc: &mut Document, param: &ResizeParam) -> EditResult {
    let kind = doc
        .kind_of(&param.element_id)
        .ok_or_else(|| EditError::NotFound(param.element_id.clone()))?;
    if param.lrx <= param.ulx || param.lry <= param.uly {
        return Err(EditError::Malformed(
            "resize rectangle must have positive extent".to_string(),
        ));
    }
    match kind {
        ElementKind::Staff | ElementKind::Syl => {}
        other => {
            return Err(EditError::Unsupported(format!(
                "cannot resize an element of class {:?}",
                other
            )))
        }
    }
    let zone_id = doc
        .get(&param.element_id)
        .and_then(|el| el.zone.clone())
        .ok_or_else(|| {
            EditError::Precondition(format!("{} has no facsimile zone", param.element_id))
        })?;
    if let Some(zone) = doc.surface.get_mut(&zone_id) {
        zone.set_bounds(param.ulx, param.uly, param.lrx, param.lry);
    }
    if kind == ElementKind::Staff {
        let lines = doc
            .staff_metrics(&param.element_id)
            .map(|m| m.lines)
            .unwrap_or(0);
        if lines > 1 {
            let unit = unit_from_height(param.lry - param.uly, lines);
            if let Some(metrics) = doc
                .get_mut(&param.element_id)
                .and_then(|el| el.staff.as_mut())
            {
                metrics.unit = unit;
            }
        }
    }
    Ok(format!("resized {}", param.element_id))
}

/// Split a staff at a horizontal position: everything anchored strictly
/// right of the cut moves to a new staff covering the right part of the
/// original rectangle. Moved elements that were governed by a clef staying on the
/// left side are re-pitched against the new staff's default clef.
pub fn split(doc: &mut Document, param: &SplitParam) -> EditResult {
    let staff = &param.element_id;
    if doc.kind_of(staff) != Some(ElementKind::Staff) {
        return Err(EditError::NotFound(staff.clone()));
    }
    let metrics = doc
        .staff_metrics(staff)
        .ok_or_else(|| EditError::Precondition(format!("staff {} has no metrics", staff)))?;
    let zone_id = doc
        .get(staff)
        .and_then(|el| el.zone.clone())
        .ok_or_else(|| EditError::Precondition(format!("staff {} has no zone", staff)))?;
    let zone = match doc.surface.get(&zone_id) {
        Some(zone) => *zone,
        None => return Err(EditError::NotFound(zone_id)),
    };
    if param.x <= zone.ulx || param.x >= zone.lrx {
        return Err(EditError::Precondition(format!(
            "split position {} is outside staff {}",
            param.x, staff
        )));
    }
    let layer = doc
        .find_child_of_kind(staff, ElementKind::Layer)
        .ok_or_else(|| EditError::Precondition(format!("staff {} has no layer", staff)))?;

    let before = clefs::governance(doc);
    let page = doc.page().clone();
    let new_staff = doc.create(ElementKind::Staff, Some(&page));
    let new_layer = doc.create(ElementKind::Layer, Some(&new_staff));
    let new_zone = doc
        .surface
        .add(crate::models::Zone::new(param.x, zone.uly, zone.lrx, zone.lry));
    if let Some(el) = doc.get_mut(&new_staff) {
        el.zone = Some(new_zone);
        el.staff = Some(metrics);
    }
    if let Some(old_zone) = doc.surface.get_mut(&zone_id) {
        old_zone.lrx = param.x;
    }

    // Elements anchored exactly at the cut stay on the left side.
    for child in doc.children_of(&layer) {
        if doc.anchor_x(&child).map(|x| x > param.x).unwrap_or(false) {
            doc.move_to(&child, &new_layer);
        }
    }
    doc.reorder_staves();
    let order = doc.preorder();
    let adjusted = clefs::reconcile(doc, &before, &order);
    debug!("split re-pitched {} elements", adjusted);
    Ok(format!("split {} into {}", staff, new_staff))
}

/// Merge two or more staves into the topmost-leftmost one. Content is
/// concatenated in staff order, and the merged rectangle spans the union
/// horizontally while averaging the vertical bounds.
pub fn merge(doc: &mut Document, ids: &[ElementId]) -> EditResult {
    if ids.len() < 2 {
        return Err(EditError::Precondition(
            "merge needs at least two staves".to_string(),
        ));
    }
    for id in ids {
        if doc.kind_of(id) != Some(ElementKind::Staff) {
            return Err(EditError::NotFound(id.clone()));
        }
    }

    let mut ordered = ids.to_vec();
    ordered.sort_by(|a, b| {
        if doc.staff_precedes(a, b) {
            std::cmp::Ordering::Less
        } else if doc.staff_precedes(b, a) {
            std::cmp::Ordering::Greater
        } else {
            std::cmp::Ordering::Equal
        }
    });
    let target = ordered[0].clone();
    let target_layer = doc
        .find_child_of_kind(&target, ElementKind::Layer)
        .ok_or_else(|| EditError::Precondition(format!("staff {} has no layer", target)))?;

    // Merged bounds: horizontal union, vertical average.
    let mut ulx = i32::MAX;
    let mut lrx = i32::MIN;
    let mut uly_sum: i64 = 0;
    let mut lry_sum: i64 = 0;
    let mut counted: i64 = 0;
    for id in &ordered {
        if let Some(zone) = doc
            .get(id)
            .and_then(|el| el.zone.as_ref())
            .and_then(|z| doc.surface.get(z))
        {
            ulx = ulx.min(zone.ulx);
            lrx = lrx.max(zone.lrx);
            uly_sum += i64::from(zone.uly);
            lry_sum += i64::from(zone.lry);
            counted += 1;
        }
    }
    if counted == 0 {
        return Err(EditError::Precondition(
            "none of the staves has a facsimile zone".to_string(),
        ));
    }

    let before = clefs::governance(doc);
    let mut zones: Vec<ZoneId> = Vec::new();
    for source in &ordered[1..] {
        if let Some(layer) = doc.find_child_of_kind(source, ElementKind::Layer) {
            for child in doc.children_of(&layer) {
                doc.move_to(&child, &target_layer);
            }
        }
        zones.extend(doc.zones_in_subtree(source));
        doc.delete_subtree(source);
    }
    collect_orphaned_zones(doc, zones);

    let target_zone = doc.get(&target).and_then(|el| el.zone.clone());
    if let Some(zone) = target_zone.and_then(|z| doc.surface.get_mut(&z)) {
        zone.set_bounds(
            ulx,
            (uly_sum / counted) as i32,
            lrx,
            (lry_sum / counted) as i32,
        );
    }
    doc.reorder_children_by_x(&target_layer);
    doc.reorder_staves();
    let order = doc.preorder();
    let adjusted = clefs::reconcile(doc, &before, &order);
    debug!("merge re-pitched {} elements", adjusted);
    Ok(format!("merged {} staves into {}", ordered.len(), target))
}

/// Drop zones no element references anymore. Zones shared with elements
/// outside a deleted subtree (ligature partners) survive.
pub(super) fn collect_orphaned_zones(doc: &mut Document, zones: Vec<ZoneId>) {
    for zone in zones {
        if doc.zone_reference_count(&zone) == 0 {
            doc.surface.delete(&zone);
        }
    }
}
