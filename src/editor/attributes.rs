//! Attribute edits: scalar attributes, syllable text, clef shape

use log::debug;

use crate::errors::{EditError, EditResult};
use crate::models::{Document, ElementKind};

use super::actions::{SetClefParam, SetParam, SetTextParam};
use super::clefs;

/// Set a scalar attribute on an element.
///
/// Clef attributes route through governance: a `line` change re-pitches the
/// governed elements by the line compensation, a `shape` change by the
/// baseline-step difference.
pub fn set(doc: &mut Document, param: &SetParam) -> EditResult {
    let kind = doc
        .kind_of(&param.element_id)
        .ok_or_else(|| EditError::NotFound(param.element_id.clone()))?;
    match param.attribute.as_str() {
        "tilt" => {
            if kind != ElementKind::Nc {
                return Err(EditError::Precondition(format!(
                    "tilt only applies to note components, not {:?}",
                    kind
                )));
            }
            let value = if param.value.is_empty() {
                None
            } else {
                Some(param.value.clone())
            };
            if let Some(el) = doc.get_mut(&param.element_id) {
                el.tilt = value;
            }
            Ok(format!("set tilt on {}", param.element_id))
        }
        "ligated" => {
            if kind != ElementKind::Nc {
                return Err(EditError::Precondition(format!(
                    "ligated only applies to note components, not {:?}",
                    kind
                )));
            }
            let value = match param.value.as_str() {
                "true" => true,
                "false" => false,
                other => {
                    return Err(EditError::Malformed(format!(
                        "ligated must be true or false, got {:?}",
                        other
                    )))
                }
            };
            if let Some(el) = doc.get_mut(&param.element_id) {
                el.ligated = value;
            }
            Ok(format!("set ligated on {}", param.element_id))
        }
        "pname" => {
            let step = crate::models::Pitch::step_from_name(&param.value)
                .ok_or_else(|| EditError::Malformed(format!("unknown step {:?}", param.value)))?;
            let pitch = doc
                .get_mut(&param.element_id)
                .and_then(|el| el.pitch.as_mut())
                .ok_or_else(|| {
                    EditError::Precondition(format!("{} bears no pitch", param.element_id))
                })?;
            pitch.step = step;
            Ok(format!("set pname on {}", param.element_id))
        }
        "oct" => {
            let octave: i32 = param
                .value
                .parse()
                .map_err(|_| EditError::Malformed(format!("bad octave {:?}", param.value)))?;
            let pitch = doc
                .get_mut(&param.element_id)
                .and_then(|el| el.pitch.as_mut())
                .ok_or_else(|| {
                    EditError::Precondition(format!("{} bears no pitch", param.element_id))
                })?;
            pitch.octave = octave;
            Ok(format!("set oct on {}", param.element_id))
        }
        "shape" => set_clef(
            doc,
            &SetClefParam {
                element_id: param.element_id.clone(),
                shape: param.value.clone(),
            },
        ),
        "line" => {
            let line: i32 = param
                .value
                .parse()
                .map_err(|_| EditError::Malformed(format!("bad line {:?}", param.value)))?;
            if doc.get(&param.element_id).and_then(|el| el.clef).is_none() {
                return Err(EditError::Precondition(format!(
                    "{} is not a clef",
                    param.element_id
                )));
            }
            let before = clefs::governance(doc);
            if let Some(clef) = doc
                .get_mut(&param.element_id)
                .and_then(|el| el.clef.as_mut())
            {
                clef.line = line;
            }
            let order = doc.preorder();
            let adjusted = clefs::reconcile(doc, &before, &order);
            debug!("clef line change re-pitched {} elements", adjusted);
            Ok(format!("set line on {}", param.element_id))
        }
        other => Err(EditError::Unsupported(format!(
            "unknown attribute {:?}",
            other
        ))),
    }
}

/// Set the text of a syllable, creating the text holder on demand. Accepts
/// either the syllable or its syl directly.
pub fn set_text(doc: &mut Document, param: &SetTextParam) -> EditResult {
    let kind = doc
        .kind_of(&param.element_id)
        .ok_or_else(|| EditError::NotFound(param.element_id.clone()))?;
    let syl = match kind {
        ElementKind::Syl => param.element_id.clone(),
        ElementKind::Syllable => doc
            .find_child_of_kind(&param.element_id, ElementKind::Syl)
            .unwrap_or_else(|| doc.create(ElementKind::Syl, Some(&param.element_id))),
        other => {
            return Err(EditError::Precondition(format!(
                "cannot set text on an element of class {:?}",
                other
            )))
        }
    };
    let text = doc
        .find_child_of_kind(&syl, ElementKind::Text)
        .unwrap_or_else(|| doc.create(ElementKind::Text, Some(&syl)));
    if let Some(el) = doc.get_mut(&text) {
        el.text = Some(param.text.clone());
    }
    Ok(format!("set text of {}", param.element_id))
}

/// Change a clef's shape in place. Its line stays put, so everything it
/// governs shifts by the baseline-step difference between the shapes.
pub fn set_clef(doc: &mut Document, param: &SetClefParam) -> EditResult {
    let shape = crate::models::ClefShape::parse(&param.shape)
        .ok_or_else(|| EditError::Malformed(format!("unknown clef shape {:?}", param.shape)))?;
    let current = doc
        .get(&param.element_id)
        .ok_or_else(|| EditError::NotFound(param.element_id.clone()))?
        .clef
        .ok_or_else(|| {
            EditError::Precondition(format!("{} is not a clef", param.element_id))
        })?;
    if current.shape == shape {
        return Ok(format!("clef {} already has that shape", param.element_id));
    }

    let before = clefs::governance(doc);
    if let Some(clef) = doc
        .get_mut(&param.element_id)
        .and_then(|el| el.clef.as_mut())
    {
        clef.shape = shape;
    }
    let order = doc.preorder();
    let adjusted = clefs::reconcile(doc, &before, &order);
    debug!("clef shape change re-pitched {} elements", adjusted);
    Ok(format!("set shape of clef {}", param.element_id))
}
