use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    /// Missing, unreadable or non-directory project root; nothing was processed
    #[error("Invalid project root {}: {reason}", path.display())]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Visitor error: {0}")]
    Visitor(#[from] codemap_visitor::VisitorError),

    #[error("Graph error: {0}")]
    Graph(#[from] codemap_graph::GraphError),
}

impl IndexerError {
    pub fn invalid_root(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::InvalidRoot {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
