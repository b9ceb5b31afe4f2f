//! # Codemap Graph
//!
//! Structural graph of a code base: modules, classes, functions and methods
//! connected by `contains`, `imports` and `calls` edges.
//!
//! ## Features
//!
//! - **Entity model** - closed table of which edge kinds may connect which node kinds
//! - **Single-writer assembly** - per-file graphs ingested in any order
//! - **Merge/dedup** - placeholders and duplicate definitions collapsed via union-find
//! - **Queries** - callers, callees, reachability and hotspots over petgraph
//!
//! ## Architecture
//!
//! ```text
//! FileGraph[] (one per visited file, any order)
//!     │
//!     ├──> Graph Assembler
//!     │      ├─ Keep same-id occurrences side by side
//!     │      ├─ Validate edges against the entity model
//!     │      └─ Park edges to unseen ids as pending
//!     │
//!     ├──> Merge Engine (finish)
//!     │      ├─ Collapse occurrences (real beats placeholder)
//!     │      ├─ Union placeholders with real nodes by dotted suffix
//!     │      └─ Rewrite edges through representatives
//!     │
//!     ├──> Validation sweep
//!     │      ├─ Redirect class calls to __init__
//!     │      ├─ Drop and report invalid edges
//!     │      └─ Report unresolved references, prune orphans
//!     │
//!     └──> ProjectGraph + sorted diagnostics
//!            ├─ GraphDocument (JSON node/edge lists)
//!            └─ GraphIndex (petgraph queries)
//! ```

mod assembler;
mod diagnostics;
mod document;
mod error;
mod graph;
mod merge;
pub mod model;
mod types;

pub use assembler::{AssembledGraph, GraphAssembler};
pub use diagnostics::{Diagnostic, Severity};
pub use document::{GraphDocument, GRAPH_DOCUMENT_VERSION};
pub use error::{GraphError, Result};
pub use graph::{GraphIndex, GraphStats, RelatedNode};
pub use merge::{MergeEngine, MergeOutput};
pub use model::validate_edge;
pub use types::{
    short_name, AttributeValue, Attributes, Edge, EdgeKind, FileGraph, Node, NodeKind,
    ProjectGraph, ATTR_BASES, ATTR_DECORATORS, ATTR_DOCSTRING, ATTR_END_LINE, ATTR_ERROR,
    ATTR_EXTERNAL, ATTR_HAS_DOCSTRING, ATTR_IS_ASYNC, ATTR_PARAMETER_COUNT,
};
