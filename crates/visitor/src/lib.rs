//! # Codemap Visitor
//!
//! Turns one Python source file into its slice of the project graph.
//!
//! ## Architecture
//!
//! ```text
//! (project root, file path)
//!     │
//!     ├──> Path Resolver ──> canonical module id (pkg/mod.py -> pkg.mod)
//!     │
//!     ├──> PythonParser (tree-sitter) ──> syntax tree | ParseError
//!     │
//!     └──> SourceVisitor
//!            ├─ Module, Class, Function/Method nodes
//!            ├─ Contains edges from the enclosing scope
//!            ├─ Imports edges to names as written (relative made absolute)
//!            └─ Calls edges to best-effort target ids
//! ```
//!
//! The visitor touches no shared state, so files can be visited in parallel.

mod config;
mod error;
mod language;
mod parser;
mod resolver;
mod visitor;

pub use config::VisitorConfig;
pub use error::{PathError, Result, VisitorError};
pub use language::Language;
pub use parser::PythonParser;
pub use resolver::{resolve, resolve_module, ModulePath};
pub use visitor::{visit_source, FileOutcome, SourceVisitor};
