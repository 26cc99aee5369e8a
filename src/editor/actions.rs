//! Action vocabulary and dispatch
//!
//! Actions arrive as JSON objects of the form `{"action": ..., "param": ...}`
//! and are deserialized straight into `EditorAction`. The dispatcher routes
//! each variant to its operation module; `chain` applies a sequence in order
//! and defers the order-invariant restoration of drags to the end.

use serde::{Deserialize, Serialize};

use crate::errors::{EditError, EditResult};
use crate::models::{Document, ElementId};

use super::EditorOptions;
use super::{attributes, drag, group, insert, structure};

/// Extra attributes accepted by `insert`.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct InsertAttributes {
    /// Clef shape for clef insertion ("C" or "F")
    #[serde(default)]
    pub shape: Option<String>,
    /// Relative contour for grouped note insertion, one of u/d/s per
    /// additional note
    #[serde(default)]
    pub contour: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DragParam {
    pub element_id: ElementId,
    pub x: i32,
    pub y: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InsertParam {
    pub element_type: String,
    #[serde(default)]
    pub staff_id: Option<ElementId>,
    pub ulx: i32,
    pub uly: i32,
    #[serde(default)]
    pub lrx: Option<i32>,
    #[serde(default)]
    pub lry: Option<i32>,
    #[serde(default)]
    pub attributes: Option<InsertAttributes>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SetParam {
    pub element_id: ElementId,
    pub attribute: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SetTextParam {
    pub element_id: ElementId,
    pub text: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SetClefParam {
    pub element_id: ElementId,
    pub shape: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RemoveParam {
    pub element_id: ElementId,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResizeParam {
    pub element_id: ElementId,
    pub ulx: i32,
    pub uly: i32,
    pub lrx: i32,
    pub lry: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GroupParam {
    pub group_type: String,
    pub element_ids: Vec<ElementId>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MergeParam {
    pub element_ids: Vec<ElementId>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SplitParam {
    pub element_id: ElementId,
    pub x: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChangeGroupParam {
    pub element_id: ElementId,
    pub contour: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLigatureParam {
    pub element_ids: Vec<ElementId>,
}

/// One editing action, tagged by name with its parameters alongside.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "action", content = "param", rename_all = "camelCase")]
pub enum EditorAction {
    Drag(DragParam),
    Insert(InsertParam),
    Set(SetParam),
    SetText(SetTextParam),
    SetClef(SetClefParam),
    Remove(RemoveParam),
    Resize(ResizeParam),
    Group(GroupParam),
    Ungroup(GroupParam),
    Merge(MergeParam),
    Split(SplitParam),
    ChangeGroup(ChangeGroupParam),
    ToggleLigature(ToggleLigatureParam),
    Chain(Vec<EditorAction>),
}

impl EditorAction {
    pub fn name(&self) -> &'static str {
        match self {
            EditorAction::Drag(_) => "drag",
            EditorAction::Insert(_) => "insert",
            EditorAction::Set(_) => "set",
            EditorAction::SetText(_) => "setText",
            EditorAction::SetClef(_) => "setClef",
            EditorAction::Remove(_) => "remove",
            EditorAction::Resize(_) => "resize",
            EditorAction::Group(_) => "group",
            EditorAction::Ungroup(_) => "ungroup",
            EditorAction::Merge(_) => "merge",
            EditorAction::Split(_) => "split",
            EditorAction::ChangeGroup(_) => "changeGroup",
            EditorAction::ToggleLigature(_) => "toggleLigature",
            EditorAction::Chain(_) => "chain",
        }
    }
}

/// Route an action to its operation.
pub fn dispatch(doc: &mut Document, options: EditorOptions, action: EditorAction) -> EditResult {
    match action {
        EditorAction::Drag(param) => {
            let outcome = drag::drag(doc, &param, false)?;
            Ok(outcome.info)
        }
        EditorAction::Insert(param) => insert::insert(doc, options, &param),
        EditorAction::Set(param) => attributes::set(doc, &param),
        EditorAction::SetText(param) => attributes::set_text(doc, &param),
        EditorAction::SetClef(param) => attributes::set_clef(doc, &param),
        EditorAction::Remove(param) => structure::remove(doc, &param.element_id),
        EditorAction::Resize(param) => structure::resize(doc, &param),
        EditorAction::Group(param) => group::group(doc, options, &param),
        EditorAction::Ungroup(param) => group::ungroup(doc, options, &param),
        EditorAction::Merge(param) => structure::merge(doc, &param.element_ids),
        EditorAction::Split(param) => structure::split(doc, &param),
        EditorAction::ChangeGroup(param) => group::change_group(doc, &param),
        EditorAction::ToggleLigature(param) => group::toggle_ligature(doc, &param.element_ids),
        EditorAction::Chain(actions) => chain(doc, options, actions),
    }
}

/// Apply a sequence of actions in order.
///
/// The chain succeeds if any member succeeds; per-member outcomes are
/// reported in the info string. Drags inside a chain skip the per-drag
/// reordering; the layer of the last dragged element is reordered once at
/// the end, so intermediate positions never thrash the sibling order.
fn chain(doc: &mut Document, options: EditorOptions, actions: Vec<EditorAction>) -> EditResult {
    let mut any_succeeded = false;
    let mut outcomes: Vec<String> = Vec::new();
    let mut deferred_layer: Option<ElementId> = None;

    for action in actions {
        let result = match action {
            EditorAction::Chain(_) => Err(EditError::Malformed(
                "chain actions cannot be nested".to_string(),
            )),
            EditorAction::Drag(param) => drag::drag(doc, &param, true).map(|outcome| {
                if let Some(layer) = outcome.deferred_reorder {
                    deferred_layer = Some(layer);
                }
                outcome.info
            }),
            other => dispatch(doc, options, other),
        };
        match result {
            Ok(info) => {
                any_succeeded = true;
                outcomes.push(info);
            }
            Err(err) => outcomes.push(err.to_string()),
        }
    }

    if let Some(layer) = deferred_layer {
        doc.reorder_children_by_x(&layer);
    }

    let info = outcomes.join("; ");
    if any_succeeded {
        Ok(info)
    } else {
        Err(EditError::Partial(info))
    }
}
