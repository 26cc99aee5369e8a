//! The editing engine
//!
//! `Editor` owns a document and applies `EditorAction`s to it, returning an
//! `EditReport` per action. Individual operations live in the submodules;
//! this module holds the dispatcher and the engine-level options.

pub mod actions;
pub mod attributes;
pub mod clefs;
pub mod drag;
pub mod group;
pub mod insert;
pub mod structure;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{EditError, EditResult};
use crate::models::Document;

pub use actions::EditorAction;

/// Engine-level behavior switches.
#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct EditorOptions {
    /// Give every newly inserted syllable an empty text holder.
    pub create_default_syl: bool,
    /// Also give that text holder a bounding box next to the new note.
    pub create_default_syl_bbox: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            create_default_syl: true,
            create_default_syl_bbox: false,
        }
    }
}

/// Outcome of one applied action, serializable back to the caller.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EditReport {
    pub success: bool,
    pub info: String,
}

impl EditReport {
    fn from_result(result: EditResult) -> Self {
        match result {
            Ok(info) => Self {
                success: true,
                info,
            },
            Err(err) => Self {
                success: false,
                info: err.to_string(),
            },
        }
    }
}

/// The stateful editor: one document plus options.
#[derive(Debug, Default)]
pub struct Editor {
    pub doc: Document,
    pub options: EditorOptions,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: EditorOptions) -> Self {
        Self {
            doc: Document::new(),
            options,
        }
    }

    pub fn from_document(doc: Document, options: EditorOptions) -> Self {
        Self { doc, options }
    }

    /// Parse and apply a JSON-encoded action.
    pub fn apply_json(&mut self, json: &str) -> Result<EditReport, EditError> {
        let action: EditorAction =
            serde_json::from_str(json).map_err(|err| EditError::Malformed(err.to_string()))?;
        Ok(self.apply(action))
    }

    /// Apply one action and report the outcome. Failures never panic; they
    /// come back as an unsuccessful report.
    pub fn apply(&mut self, action: EditorAction) -> EditReport {
        info!("applying action: {}", action.name());
        let result = actions::dispatch(&mut self.doc, self.options, action);
        if let Err(err) = &result {
            warn!("action failed: {}", err);
        }
        EditReport::from_result(result)
    }
}
