use serde::{Deserialize, Serialize};

/// Configuration for source visiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorConfig {
    /// Calls to Python builtins (`print`, `len`, ...) produce no edge
    pub skip_builtin_calls: bool,

    /// Store docstring text in node attributes (presence is always recorded)
    pub capture_docstrings: bool,
}

impl Default for VisitorConfig {
    fn default() -> Self {
        Self {
            skip_builtin_calls: true,
            capture_docstrings: true,
        }
    }
}

impl VisitorConfig {
    /// Structure only: no docstring text in the output
    pub fn minimal() -> Self {
        Self {
            capture_docstrings: false,
            ..Default::default()
        }
    }
}
