use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Unsupported graph document version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
