//! # Codemap Indexer
//!
//! Builds the code-structure graph of a whole Python project.
//!
//! ## Pipeline
//!
//! ```text
//! Project root
//!     │
//!     ├──> File Scanner (.gitignore aware)
//!     │      └─> Sorted source files
//!     │
//!     ├──> Workers (blocking tasks, bounded by `concurrency`)
//!     │      └─> resolve -> read -> visit  ==> FileOutcome per file
//!     │
//!     └──> Assembler task (single writer, mpsc consumer)
//!            └─> merge + validation sweep ==> ProjectGraph + diagnostics
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use codemap_indexer::{IndexerConfig, ProjectIndexer};
//!
//! #[tokio::main]
//! async fn main() -> codemap_indexer::Result<()> {
//!     let config = IndexerConfig::load(std::path::Path::new("."), None)?;
//!     let indexer = ProjectIndexer::new(".", config).await?;
//!     let outcome = indexer.build().await?;
//!
//!     println!(
//!         "{} nodes, {} edges, {} diagnostics",
//!         outcome.stats.nodes,
//!         outcome.stats.edges,
//!         outcome.diagnostics.len()
//!     );
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod indexer;
mod scanner;
mod stats;

pub use config::{IndexerConfig, CONCURRENCY_ENV, CONFIG_FILE_NAME};
pub use error::{IndexerError, Result};
pub use indexer::{IndexOutcome, ProjectIndexer};
pub use scanner::{FileScanner, ScanOptions};
pub use stats::IndexStats;
