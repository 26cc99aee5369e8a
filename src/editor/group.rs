//! Grouping edits: group, ungroup, contour changes, ligatures

use log::debug;

use crate::errors::{EditError, EditResult};
use crate::geometry::{note_height, note_width};
use crate::models::{Document, ElementId, ElementKind, StaffMetrics, Zone};

use super::actions::{ChangeGroupParam, GroupParam};
use super::structure::collect_orphaned_zones;
use super::{clefs, EditorOptions};

/// Merge sibling groupings into one container: note components into a
/// neume, or neumes into a syllable.
///
/// The target container depends on how the selection covers its current
/// parents. A parent is "full" when every one of its members is selected.
/// Exactly one full parent: reuse it. No full parent: create a fresh
/// container beside the first element's parent. Several full parents: also
/// create a fresh container; for syllables it carries the sources' text,
/// concatenated left to right, and the enclosing rectangle of their text
/// boxes. Emptied source containers are pruned afterwards.
pub fn group(doc: &mut Document, options: EditorOptions, param: &GroupParam) -> EditResult {
    let (member_kind, container_kind) = match param.group_type.as_str() {
        "neume" => (ElementKind::Neume, ElementKind::Syllable),
        "nc" => (ElementKind::Nc, ElementKind::Neume),
        other => {
            return Err(EditError::Unsupported(format!(
                "unknown group type {:?}",
                other
            )))
        }
    };
    let ordered = in_document_order(doc, &param.element_ids, member_kind)?;
    if ordered.len() < 2 {
        return Err(EditError::Precondition(
            "grouping needs at least two elements".to_string(),
        ));
    }
    let layer = doc
        .layer_of(&ordered[0])
        .ok_or_else(|| EditError::Precondition(format!("{} is not in a layer", ordered[0])))?;
    for id in &ordered {
        if doc.layer_of(id).as_deref() != Some(layer.as_str()) {
            return Err(EditError::Precondition(
                "grouping cannot cross staves".to_string(),
            ));
        }
    }

    let mut parents: Vec<ElementId> = Vec::new();
    for id in &ordered {
        if let Some(parent) = doc.parent_of(id) {
            if !parents.contains(&parent) {
                parents.push(parent);
            }
        }
    }
    let full: Vec<ElementId> = parents
        .iter()
        .filter(|parent| {
            doc.children_of(parent)
                .iter()
                .filter(|child| doc.kind_of(child) == Some(member_kind))
                .all(|child| ordered.contains(child))
        })
        .cloned()
        .collect();

    let before = clefs::governance(doc);
    let (target, created) = match full.len() {
        1 => (full[0].clone(), false),
        0 => (
            new_container(doc, options, container_kind, &ordered[0], None)?,
            true,
        ),
        _ => {
            let content = if container_kind == ElementKind::Syllable {
                let mut text = String::new();
                let mut rect: Option<Zone> = None;
                for parent in &full {
                    if let Some(part) = syllable_text(doc, parent) {
                        text.push_str(&part);
                    }
                    if let Some(zone) = syl_zone(doc, parent) {
                        rect = Some(match rect {
                            Some(acc) => union(acc, zone),
                            None => zone,
                        });
                    }
                }
                Some((text, rect))
            } else {
                None
            };
            (
                new_container(doc, options, container_kind, &ordered[0], content)?,
                true,
            )
        }
    };

    for id in &ordered {
        doc.move_to(id, &target);
    }
    doc.reorder_children_by_x(&target);

    // Prune emptied source containers and any containers they empty in
    // turn (an nc-grouping across syllables leaves the losing syllable
    // without note components).
    let mut zones = Vec::new();
    for parent in &parents {
        let mut candidate = Some(parent.clone());
        while let Some(container) = candidate {
            if container == target {
                break;
            }
            let empty = match doc.kind_of(&container) {
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

    if created && container_kind == ElementKind::Syllable && options.create_default_syl_bbox {
        attach_syl_bbox_below(doc, &target);
    }

    doc.reorder_children_by_x(&layer);
    let order = doc.preorder();
    let adjusted = clefs::reconcile(doc, &before, &order);
    debug!("grouping re-pitched {} elements", adjusted);
    Ok(format!("grouped {} elements into {}", ordered.len(), target))
}

/// Split a container apart: the first listed element keeps the original
/// container; each subsequent one gets a structure-only clone of it,
/// inserted right after so document order is preserved. Ungrouping the two
/// halves of a ligature also dissolves the ligature.
pub fn ungroup(doc: &mut Document, options: EditorOptions, param: &GroupParam) -> EditResult {
    let member_kind = match param.group_type.as_str() {
        "neume" => ElementKind::Neume,
        "nc" => ElementKind::Nc,
        other => {
            return Err(EditError::Unsupported(format!(
                "unknown group type {:?}",
                other
            )))
        }
    };
    let ordered = in_document_order(doc, &param.element_ids, member_kind)?;
    if ordered.len() < 2 {
        return Err(EditError::Precondition(
            "ungrouping needs at least two elements".to_string(),
        ));
    }
    let container = doc
        .parent_of(&ordered[0])
        .ok_or_else(|| EditError::Precondition(format!("{} has no parent", ordered[0])))?;
    for id in &ordered {
        if doc.parent_of(id).as_ref() != Some(&container) {
            return Err(EditError::Precondition(
                "can only ungroup elements of one container".to_string(),
            ));
        }
    }

    if member_kind == ElementKind::Nc && ordered.len() == 2 {
        let pair = [ordered[0].clone(), ordered[1].clone()];
        if both_ligated(doc, &pair) {
            dissolve_ligature(doc, &pair)?;
        }
    }

    let grandparent = doc
        .parent_of(&container)
        .ok_or_else(|| EditError::Precondition(format!("{} has no parent", container)))?;
    let base_index = doc
        .children_of(&grandparent)
        .iter()
        .position(|child| child == &container)
        .unwrap_or(0);

    let mut created = 0;
    for (offset, id) in ordered.iter().skip(1).enumerate() {
        let new_container = doc
            .clone_structure_only(&container)
            .ok_or_else(|| EditError::NotFound(container.clone()))?;
        doc.insert_child_at(&grandparent, &new_container, base_index + offset + 1);
        doc.move_to(id, &new_container);
        if doc.kind_of(&new_container) == Some(ElementKind::Syllable)
            && options.create_default_syl
        {
            let syl = doc.create(ElementKind::Syl, Some(&new_container));
            doc.create(ElementKind::Text, Some(&syl));
            if options.create_default_syl_bbox {
                attach_syl_bbox_below(doc, &new_container);
            }
        }
        created += 1;
    }

    Ok(format!(
        "ungrouped {} elements out of {}, creating {} containers",
        ordered.len(),
        container,
        created
    ))
}

/// Regenerate a neume's note components from a contour string, one u/d/s
/// per component after the first. The first component stays as the pitch
/// and geometry anchor; everything after it is discarded and rebuilt, each
/// new component one note width right of its predecessor and one step up,
/// down, or level.
pub fn change_group(doc: &mut Document, param: &ChangeGroupParam) -> EditResult {
    if doc.kind_of(&param.element_id) != Some(ElementKind::Neume) {
        return Err(EditError::Precondition(format!(
            "{} is not a neume",
            param.element_id
        )));
    }
    if let Some(bad) = param.contour.chars().find(|c| !matches!(c, 'u' | 'd' | 's')) {
        return Err(EditError::Malformed(format!(
            "invalid contour character {:?}",
            bad
        )));
    }
    let ncs: Vec<ElementId> = doc
        .children_of(&param.element_id)
        .into_iter()
        .filter(|child| doc.kind_of(child) == Some(ElementKind::Nc))
        .collect();
    let anchor = ncs
        .first()
        .cloned()
        .ok_or_else(|| EditError::Precondition(format!("{} has no components", param.element_id)))?;
    let metrics = metrics_for(doc, &param.element_id)?;

    let mut pitch = doc
        .get(&anchor)
        .and_then(|el| el.pitch)
        .ok_or_else(|| EditError::Precondition(format!("{} has no pitch", anchor)))?;
    let mut rect = doc
        .get(&anchor)
        .and_then(|el| el.zone.as_ref())
        .and_then(|z| doc.surface.get(z))
        .copied()
        .ok_or_else(|| EditError::Precondition(format!("{} has no zone", anchor)))?;

    let mut zones = Vec::new();
    for nc in &ncs[1..] {
        zones.extend(doc.zones_in_subtree(nc));
        doc.delete_subtree(nc);
    }
    collect_orphaned_zones(doc, zones);
    // A discarded ligature partner leaves the anchor unligated.
    if let Some(el) = doc.get_mut(&anchor) {
        el.ligated = false;
    }

    let width = note_width(metrics);
    let height = note_height(metrics);
    for direction in param.contour.chars() {
        let delta = match direction {
            'u' => 1,
            'd' => -1,
            _ => 0,
        };
        pitch.adjust_by_offset(delta);
        rect = Zone::new(
            rect.ulx + width,
            rect.uly - delta * metrics.unit,
            rect.ulx + 2 * width,
            rect.uly - delta * metrics.unit + height,
        );
        let follower = doc.create(ElementKind::Nc, Some(&param.element_id));
        let zone = doc.surface.add(rect);
        if let Some(el) = doc.get_mut(&follower) {
            el.zone = Some(zone);
            el.pitch = Some(pitch);
        }
    }
    Ok(format!(
        "rebuilt {} with contour {:?}",
        param.element_id, param.contour
    ))
}

/// Toggle the ligature flag on a pair of adjacent note components. Turning
/// it on makes the second component share the first's zone; turning it off
/// gives the second its own zone, offset one note width and height from the
/// first's.
pub fn toggle_ligature(doc: &mut Document, ids: &[ElementId]) -> EditResult {
    let ordered = in_document_order(doc, ids, ElementKind::Nc)?;
    // Checked after ordering: duplicates collapse there.
    if ordered.len() != 2 {
        return Err(EditError::Precondition(
            "ligature toggling needs exactly two distinct note components".to_string(),
        ));
    }
    let pair = [ordered[0].clone(), ordered[1].clone()];
    let parent = doc
        .parent_of(&pair[0])
        .ok_or_else(|| EditError::Precondition(format!("{} has no parent", pair[0])))?;
    if doc.parent_of(&pair[1]).as_ref() != Some(&parent) {
        return Err(EditError::Precondition(
            "ligature components must share a neume".to_string(),
        ));
    }
    let siblings = doc.children_of(&parent);
    let first_pos = siblings.iter().position(|id| id == &pair[0]);
    let second_pos = siblings.iter().position(|id| id == &pair[1]);
    match (first_pos, second_pos) {
        (Some(a), Some(b)) if b == a + 1 => {}
        _ => {
            return Err(EditError::Precondition(
                "ligature components must be adjacent".to_string(),
            ))
        }
    }

    if both_ligated(doc, &pair) {
        dissolve_ligature(doc, &pair)?;
        Ok(format!("dissolved ligature of {} and {}", pair[0], pair[1]))
    } else {
        form_ligature(doc, &pair)?;
        Ok(format!("formed ligature of {} and {}", pair[0], pair[1]))
    }
}

fn both_ligated(doc: &Document, pair: &[ElementId; 2]) -> bool {
    pair.iter()
        .all(|id| doc.get(id).map(|el| el.ligated).unwrap_or(false))
}

/// Point the second component at the first's zone and drop its own.
fn form_ligature(doc: &mut Document, pair: &[ElementId; 2]) -> Result<(), EditError> {
    let first_zone = doc
        .get(&pair[0])
        .and_then(|el| el.zone.clone())
        .ok_or_else(|| EditError::Precondition(format!("{} has no zone", pair[0])))?;
    let old_second = doc.detach_zone(&pair[1]);
    if let Some(el) = doc.get_mut(&pair[1]) {
        el.zone = Some(first_zone);
        el.ligated = true;
    }
    if let Some(el) = doc.get_mut(&pair[0]) {
        el.ligated = true;
    }
    if let Some(orphan) = old_second {
        if doc.zone_reference_count(&orphan) == 0 {
            doc.surface.delete(&orphan);
        }
    }
    Ok(())
}

/// Give the second component a zone of its own again, one note width and
/// height away from the first's, and clear both flags.
fn dissolve_ligature(doc: &mut Document, pair: &[ElementId; 2]) -> Result<(), EditError> {
    let metrics = metrics_for(doc, &pair[0])?;
    let first = doc
        .get(&pair[0])
        .and_then(|el| el.zone.as_ref())
        .and_then(|z| doc.surface.get(z))
        .copied()
        .ok_or_else(|| EditError::Precondition(format!("{} has no zone", pair[0])))?;
    let width = note_width(metrics);
    let height = note_height(metrics);
    let second = doc.surface.add(Zone::new(
        first.ulx + width,
        first.uly + height,
        first.lrx + width,
        first.lry + height,
    ));
    if let Some(el) = doc.get_mut(&pair[1]) {
        el.zone = Some(second);
        el.ligated = false;
    }
    if let Some(el) = doc.get_mut(&pair[0]) {
        el.ligated = false;
    }
    Ok(())
}

/// Build a fresh grouping container beside the first member's current
/// parent. For syllables, `syl_content` carries pre-computed text and text
/// box; otherwise an empty text holder is attached when enabled.
fn new_container(
    doc: &mut Document,
    options: EditorOptions,
    kind: ElementKind,
    first_member: &str,
    syl_content: Option<(String, Option<Zone>)>,
) -> Result<ElementId, EditError> {
    let parent = doc
        .parent_of(first_member)
        .ok_or_else(|| EditError::Precondition(format!("{} has no parent", first_member)))?;
    let grandparent = doc
        .parent_of(&parent)
        .ok_or_else(|| EditError::Precondition(format!("{} has no parent", parent)))?;
    let index = doc
        .children_of(&grandparent)
        .iter()
        .position(|child| child == &parent)
        .unwrap_or(0);
    let container = doc.create(kind, None);
    doc.insert_child_at(&grandparent, &container, index);

    if kind == ElementKind::Syllable {
        match syl_content {
            Some((text, rect)) => {
                let syl = doc.create(ElementKind::Syl, Some(&container));
                let text_el = doc.create(ElementKind::Text, Some(&syl));
                if let Some(el) = doc.get_mut(&text_el) {
                    el.text = Some(text);
                }
                if let Some(rect) = rect {
                    let zone = doc.surface.add(rect);
                    if let Some(el) = doc.get_mut(&syl) {
                        el.zone = Some(zone);
                    }
                }
            }
            None if options.create_default_syl => {
                let syl = doc.create(ElementKind::Syl, Some(&container));
                doc.create(ElementKind::Text, Some(&syl));
            }
            None => {}
        }
    }
    Ok(container)
}

/// Default text box for a freshly grouped syllable: below the union of its
/// members' zones, pushed right a little so it does not sit under the
/// notes.
fn attach_syl_bbox_below(doc: &mut Document, syllable: &str) {
    let Ok(metrics) = metrics_for(doc, syllable) else {
        return;
    };
    let Some(syl) = doc.find_child_of_kind(syllable, ElementKind::Syl) else {
        return;
    };
    if doc.get(&syl).map(|el| el.has_facs()).unwrap_or(true) {
        return;
    }
    let mut rect: Option<Zone> = None;
    for zone_id in doc.zones_in_subtree(syllable) {
        if let Some(zone) = doc.surface.get(&zone_id) {
            rect = Some(match rect {
                Some(acc) => union(acc, *zone),
                None => *zone,
            });
        }
    }
    if let Some(rect) = rect {
        let zone = doc.surface.add(Zone::new(
            rect.ulx + note_width(metrics),
            rect.lry + metrics.unit,
            rect.lrx + note_width(metrics),
            rect.lry + 3 * metrics.unit,
        ));
        if let Some(el) = doc.get_mut(&syl) {
            el.zone = Some(zone);
        }
    }
}

fn union(a: Zone, b: Zone) -> Zone {
    Zone::new(
        a.ulx.min(b.ulx),
        a.uly.min(b.uly),
        a.lrx.max(b.lrx),
        a.lry.max(b.lry),
    )
}

fn syl_zone(doc: &Document, syllable: &str) -> Option<Zone> {
    let syl = doc.find_child_of_kind(syllable, ElementKind::Syl)?;
    let zone = doc.get(&syl)?.zone.as_ref()?;
    doc.surface.get(zone).copied()
}

fn metrics_for(doc: &Document, id: &str) -> Result<StaffMetrics, EditError> {
    let staff = doc
        .staff_of(id)
        .ok_or_else(|| EditError::Precondition(format!("{} is not on a staff", id)))?;
    doc.staff_metrics(&staff)
        .ok_or_else(|| EditError::Precondition(format!("staff {} has no metrics", staff)))
}

/// Syllable text, read through its syl's text child.
fn syllable_text(doc: &Document, syllable: &str) -> Option<String> {
    let syl = doc.find_child_of_kind(syllable, ElementKind::Syl)?;
    let text = doc.find_child_of_kind(&syl, ElementKind::Text)?;
    doc.get(&text).and_then(|el| el.text.clone())
}

/// Validate a batch of ids against an expected class and return them sorted
/// by document position. Text-side elements (syls and their text) are
/// silently dropped from the selection; anything else of the wrong class is
/// an error.
fn in_document_order(
    doc: &Document,
    ids: &[ElementId],
    kind: ElementKind,
) -> Result<Vec<ElementId>, EditError> {
    let mut sorted: Vec<ElementId> = Vec::with_capacity(ids.len());
    for id in ids {
        match doc.kind_of(id) {
            None => return Err(EditError::NotFound(id.clone())),
            Some(ElementKind::Syl) | Some(ElementKind::Text) => {}
            Some(actual) if actual != kind => {
                return Err(EditError::Precondition(format!(
                    "{} is a {:?}, expected {:?}",
                    id, actual, kind
                )))
            }
            _ => sorted.push(id.clone()),
        }
    }
    if sorted.is_empty() {
        return Err(EditError::Precondition(format!(
            "no {:?} elements in the selection",
            kind
        )));
    }
    let order = doc.preorder();
    sorted.sort_by_key(|id| order.iter().position(|o| o == id).unwrap_or(usize::MAX));
    sorted.dedup();
    Ok(sorted)
}
