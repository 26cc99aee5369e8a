//! Insert operations
//!
//! Insertion is facsimile-first: the caller supplies where on the image the
//! new element lands, and the symbolic side (pitch, clef line, sibling
//! position) is derived from that position and the staff's metrics.

use log::debug;

use crate::errors::{EditError, EditResult};
use crate::geometry::{
    clef_line_for_position, note_height, note_width, pitch_for_position, unit_from_height,
};
use crate::models::{
    ClefData, ClefShape, Document, ElementId, ElementKind, StaffMetrics, Zone,
};

use super::actions::InsertParam;
use super::{clefs, EditorOptions};

const DEFAULT_STAFF_LINES: i32 = 4;
const DEFAULT_CLEF: ClefData = ClefData {
    shape: ClefShape::C,
    line: 3,
};

pub fn insert(doc: &mut Document, options: EditorOptions, param: &InsertParam) -> EditResult {
    match param.element_type.as_str() {
        "staff" => insert_staff(doc, param),
        "nc" => insert_nc(doc, options, param),
        "custos" => insert_custos(doc, param),
        "clef" => insert_clef(doc, param),
        other => Err(EditError::Unsupported(format!(
            "cannot insert element type {:?}",
            other
        ))),
    }
}

/// Create a staff (with its single layer) covering the given rectangle. The
/// drawing unit is derived from the rectangle height; line count and default
/// clef are copied from an existing staff when the page has one.
fn insert_staff(doc: &mut Document, param: &InsertParam) -> EditResult {
    let (lrx, lry) = match (param.lrx, param.lry) {
        (Some(lrx), Some(lry)) => (lrx, lry),
        _ => {
            return Err(EditError::Malformed(
                "staff insertion requires lrx and lry".to_string(),
            ))
        }
    };
    if lrx <= param.ulx || lry <= param.uly {
        return Err(EditError::Malformed(
            "staff rectangle must have positive extent".to_string(),
        ));
    }

    let (lines, default_clef) = doc
        .children_of(&doc.page().clone())
        .iter()
        .find_map(|id| doc.staff_metrics(id))
        .map(|m| (m.lines, m.default_clef))
        .unwrap_or((DEFAULT_STAFF_LINES, DEFAULT_CLEF));
    let unit = unit_from_height(lry - param.uly, lines);
    if unit <= 0 {
        return Err(EditError::Malformed(
            "staff rectangle too small for its line count".to_string(),
        ));
    }

    let page = doc.page().clone();
    let staff = doc.create(ElementKind::Staff, Some(&page));
    doc.create(ElementKind::Layer, Some(&staff));
    let zone = doc
        .surface
        .add(Zone::new(param.ulx, param.uly, lrx, lry));
    if let Some(el) = doc.get_mut(&staff) {
        el.zone = Some(zone);
        el.staff = Some(StaffMetrics::new(unit, lines, default_clef));
    }
    doc.reorder_staves();
    Ok(format!("inserted staff {}", staff))
}

/// Insert a note component wrapped in a fresh syllable and neume. An
/// optional contour string extends the neume with further components pitched
/// relative to the first (u up a step, d down, s same).
fn insert_nc(doc: &mut Document, options: EditorOptions, param: &InsertParam) -> EditResult {
    let staff = resolve_staff(doc, param)?;
    let (metrics, staff_zone) = staff_context(doc, &staff)?;
    let layer = doc
        .find_child_of_kind(&staff, ElementKind::Layer)
        .ok_or_else(|| EditError::Precondition(format!("staff {} has no layer", staff)))?;

    let contour = match param.attributes.as_ref().and_then(|a| a.contour.as_deref()) {
        Some(contour) => {
            if let Some(bad) = contour.chars().find(|c| !matches!(c, 'u' | 'd' | 's')) {
                return Err(EditError::Malformed(format!(
                    "invalid contour character {:?}",
                    bad
                )));
            }
            contour.to_string()
        }
        None => String::new(),
    };

    let syllable = doc.create(ElementKind::Syllable, Some(&layer));
    let neume = doc.create(ElementKind::Neume, Some(&syllable));
    let nc = doc.create(ElementKind::Nc, Some(&neume));

    let width = note_width(metrics);
    let height = note_height(metrics);
    let zone = doc.surface.add(Zone::new(
        param.ulx,
        param.uly,
        param.ulx + width,
        param.uly + height,
    ));
    if let Some(el) = doc.get_mut(&nc) {
        el.zone = Some(zone);
    }
    doc.reorder_children_by_x(&layer);

    let order = doc.preorder();
    let governor = clefs::governor_of(doc, &nc, &order)
        .ok_or_else(|| EditError::Precondition(format!("no clef governs position of {}", nc)))?;
    let mut pitch = pitch_for_position(param.uly, staff_zone.uly, governor, metrics);
    if let Some(el) = doc.get_mut(&nc) {
        el.pitch = Some(pitch);
    }

    // Contour components sit to the right of their predecessor, one step up,
    // down, or level.
    let mut ulx = param.ulx;
    let mut uly = param.uly;
    for direction in contour.chars() {
        let delta = match direction {
            'u' => 1,
            'd' => -1,
            _ => 0,
        };
        ulx += width;
        uly -= delta * metrics.unit;
        pitch.adjust_by_offset(delta);
        let follower = doc.create(ElementKind::Nc, Some(&neume));
        let zone = doc
            .surface
            .add(Zone::new(ulx, uly, ulx + width, uly + height));
        if let Some(el) = doc.get_mut(&follower) {
            el.zone = Some(zone);
            el.pitch = Some(pitch);
        }
    }

    if options.create_default_syl {
        attach_default_syl(doc, options, &syllable, param.ulx, &staff_zone, metrics);
    }

    debug!("inserted nc {} under syllable {}", nc, syllable);
    Ok(format!("inserted nc {}", nc))
}

/// Insert a custos directly into the layer, pitched from its position.
fn insert_custos(doc: &mut Document, param: &InsertParam) -> EditResult {
    let staff = resolve_staff(doc, param)?;
    let (metrics, staff_zone) = staff_context(doc, &staff)?;
    let layer = doc
        .find_child_of_kind(&staff, ElementKind::Layer)
        .ok_or_else(|| EditError::Precondition(format!("staff {} has no layer", staff)))?;

    let custos = doc.create(ElementKind::Custos, Some(&layer));
    let zone = doc.surface.add(Zone::new(
        param.ulx,
        param.uly,
        param.ulx + note_width(metrics),
        param.uly + note_height(metrics),
    ));
    if let Some(el) = doc.get_mut(&custos) {
        el.zone = Some(zone);
    }
    doc.reorder_children_by_x(&layer);

    let order = doc.preorder();
    let governor = clefs::governor_of(doc, &custos, &order).ok_or_else(|| {
        EditError::Precondition(format!("no clef governs position of {}", custos))
    })?;
    let pitch = pitch_for_position(param.uly, staff_zone.uly, governor, metrics);
    if let Some(el) = doc.get_mut(&custos) {
        el.pitch = Some(pitch);
    }
    Ok(format!("inserted custos {}", custos))
}

/// Insert a clef at the nearest staff line; everything it newly governs is
/// re-pitched to keep its drawn position.
fn insert_clef(doc: &mut Document, param: &InsertParam) -> EditResult {
    let shape = param
        .attributes
        .as_ref()
        .and_then(|a| a.shape.as_deref())
        .and_then(ClefShape::parse)
        .ok_or_else(|| EditError::Malformed("clef insertion requires a C or F shape".to_string()))?;
    let staff = resolve_staff(doc, param)?;
    let (metrics, staff_zone) = staff_context(doc, &staff)?;
    let layer = doc
        .find_child_of_kind(&staff, ElementKind::Layer)
        .ok_or_else(|| EditError::Precondition(format!("staff {} has no layer", staff)))?;
    let line = clef_line_for_position(param.uly, staff_zone.uly, metrics);

    let before = clefs::governance(doc);
    let clef = doc.create(ElementKind::Clef, Some(&layer));
    let zone = doc.surface.add(Zone::new(
        param.ulx,
        param.uly - metrics.unit,
        param.ulx + note_width(metrics),
        param.uly + metrics.unit,
    ));
    if let Some(el) = doc.get_mut(&clef) {
        el.zone = Some(zone);
        el.clef = Some(ClefData::new(shape, line));
    }
    doc.reorder_children_by_x(&layer);
    let order = doc.preorder();
    let adjusted = clefs::reconcile(doc, &before, &order);
    debug!("clef insertion re-pitched {} elements", adjusted);
    Ok(format!("inserted clef {} on line {}", clef, line))
}

/// The staff an insertion targets: the explicit id when given, otherwise the
/// staff whose zone contains (or is nearest to) the insertion point.
fn resolve_staff(doc: &Document, param: &InsertParam) -> Result<ElementId, EditError> {
    if let Some(staff) = &param.staff_id {
        if doc.kind_of(staff) != Some(ElementKind::Staff) {
            return Err(EditError::NotFound(staff.clone()));
        }
        return Ok(staff.clone());
    }
    let mut best: Option<(i64, ElementId)> = None;
    for id in doc.children_of(&doc.page().clone()) {
        if doc.kind_of(&id) != Some(ElementKind::Staff) {
            continue;
        }
        let Some(zone) = doc.get(&id).and_then(|el| el.zone.as_ref()).and_then(|z| doc.surface.get(z))
        else {
            continue;
        };
        let (cx, cy) = zone.center();
        let dx = i64::from(param.ulx - cx);
        let dy = i64::from(param.uly - cy);
        let distance = dx * dx + dy * dy;
        if best.as_ref().map(|(d, _)| distance < *d).unwrap_or(true) {
            best = Some((distance, id));
        }
    }
    best.map(|(_, id)| id)
        .ok_or_else(|| EditError::Precondition("page has no staff to insert into".to_string()))
}

fn staff_context(doc: &Document, staff: &str) -> Result<(StaffMetrics, Zone), EditError> {
    let metrics = doc
        .staff_metrics(staff)
        .ok_or_else(|| EditError::Precondition(format!("staff {} has no metrics", staff)))?;
    let zone = doc
        .get(staff)
        .and_then(|el| el.zone.as_ref())
        .and_then(|z| doc.surface.get(z))
        .copied()
        .ok_or_else(|| EditError::Precondition(format!("staff {} has no zone", staff)))?;
    Ok((metrics, zone))
}

/// Give a syllable its empty text holder, optionally with a bounding box
/// below the staff.
fn attach_default_syl(
    doc: &mut Document,
    options: EditorOptions,
    syllable: &str,
    ulx: i32,
    staff_zone: &Zone,
    metrics: StaffMetrics,
) {
    let syl = doc.create(ElementKind::Syl, Some(syllable));
    doc.create(ElementKind::Text, Some(&syl));
    if options.create_default_syl_bbox {
        let zone = doc.surface.add(Zone::new(
            ulx,
            staff_zone.lry,
            ulx + 2 * note_width(metrics),
            staff_zone.lry + 2 * metrics.unit,
        ));
        if let Some(el) = doc.get_mut(&syl) {
            el.zone = Some(zone);
        }
    }
}
