use crate::types::Edge;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Recoverable problem found while building the project graph.
///
/// Diagnostics travel next to the graph instead of aborting the run.
#[derive(Error, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// File outside the project root; the file was skipped
    #[error("{path}: {message}")]
    PathError { path: String, message: String },

    /// File could not be read; the file was skipped
    #[error("{file_path}: unreadable: {message}")]
    ReadError { file_path: String, message: String },

    /// Malformed source; the module node is kept with an `error` attribute
    #[error("{file_path}: parse error: {message}")]
    ParseError {
        module_id: String,
        file_path: String,
        message: String,
    },

    /// Edge violating the entity model; the edge was dropped
    #[error("invalid edge {edge}: {reason}")]
    InvalidEdgeError { edge: Edge, reason: String },

    /// Edge still pointing at an external placeholder after the run
    #[error("unresolved reference {edge}")]
    UnresolvedReferenceWarning { edge: Edge },

    /// Two real definitions claim one id; `kept` is canonical
    #[error("duplicate definition of {id}: kept {kept}, ignored {ignored}")]
    DuplicateDefinitionWarning {
        id: String,
        kept: String,
        ignored: String,
    },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::PathError { .. }
            | Diagnostic::ReadError { .. }
            | Diagnostic::ParseError { .. }
            | Diagnostic::InvalidEdgeError { .. } => Severity::Error,
            Diagnostic::UnresolvedReferenceWarning { .. }
            | Diagnostic::DuplicateDefinitionWarning { .. } => Severity::Warning,
        }
    }

    /// Stable category name, matches the serialized `kind` tag
    pub fn category(&self) -> &'static str {
        match self {
            Diagnostic::PathError { .. } => "path_error",
            Diagnostic::ReadError { .. } => "read_error",
            Diagnostic::ParseError { .. } => "parse_error",
            Diagnostic::InvalidEdgeError { .. } => "invalid_edge_error",
            Diagnostic::UnresolvedReferenceWarning { .. } => "unresolved_reference_warning",
            Diagnostic::DuplicateDefinitionWarning { .. } => "duplicate_definition_warning",
        }
    }

    /// Failures that make a file's contribution unusable (as opposed to degraded)
    pub fn is_file_fatal(&self) -> bool {
        matches!(
            self,
            Diagnostic::PathError { .. } | Diagnostic::ReadError { .. }
        )
    }
}
