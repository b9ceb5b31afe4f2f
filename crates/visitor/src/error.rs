use std::path::PathBuf;
use thiserror::Error;

/// Result type for visitor operations
pub type Result<T> = std::result::Result<T, VisitorError>;

/// Errors that can occur while turning a source file into a file graph
#[derive(Error, Debug)]
pub enum VisitorError {
    /// File location cannot be mapped to a module id
    #[error(transparent)]
    Path(#[from] PathError),

    /// Source has syntax errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Tree-sitter setup failed
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
}

impl VisitorError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitter(msg.into())
    }

    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }
}

/// Failure to derive a canonical module id from a file path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("{} lies outside project root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// Component that would make the dotted id ambiguous
    #[error("{}: component {component:?} cannot be part of a module id", path.display())]
    InvalidComponent { path: PathBuf, component: String },

    #[error("{}: no module path left after stripping the root", path.display())]
    EmptyModulePath { path: PathBuf },
}

impl PathError {
    /// Path the error is about
    pub fn path(&self) -> &std::path::Path {
        match self {
            PathError::OutsideRoot { path, .. }
            | PathError::InvalidComponent { path, .. }
            | PathError::EmptyModulePath { path } => path,
        }
    }
}
