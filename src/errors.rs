//! Error taxonomy for edit operations

use thiserror::Error;

/// Failure modes of a single edit operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// A referenced element or zone does not exist in the document.
    #[error("element not found: {0}")]
    NotFound(String),

    /// The target exists but does not satisfy the operation's precondition
    /// (wrong class, missing capability, wrong child count, ...).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The operation is recognized but not applicable to this target class.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The action payload is structurally invalid.
    #[error("malformed action: {0}")]
    Malformed(String),

    /// Part of a multi-target operation failed after earlier parts applied.
    #[error("partial failure: {0}")]
    Partial(String),
}

/// Outcome of one edit operation: a human-readable info string on success.
pub type EditResult = Result<String, EditError>;
