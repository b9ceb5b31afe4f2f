use crate::error::{Result, VisitorError};
use std::path::Path;

/// Source language the visitor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_lowercase().as_str() {
            "py" | "pyi" | "pyw" => Ok(Language::Python),
            other => Err(VisitorError::unsupported_language(other)),
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| VisitorError::unsupported_language(path.display().to_string()))?;
        Self::from_extension(ext)
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> tree_sitter::Language {
        match self {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }
}
