use codemap_graph::{Diagnostic, NodeKind, ProjectGraph};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics about one indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Files found by the scanner
    pub files_scanned: usize,

    /// Files whose outcome reached the assembler
    pub files_ingested: usize,

    pub modules: usize,
    pub nodes: usize,
    pub edges: usize,

    /// Diagnostic counts keyed by category
    pub diagnostics: BTreeMap<String, usize>,

    /// Scheduling stopped early because of `fail_fast`
    pub aborted: bool,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl IndexStats {
    pub fn new(files_scanned: usize) -> Self {
        Self {
            files_scanned,
            ..Self::default()
        }
    }

    pub fn record_graph(&mut self, graph: &ProjectGraph) {
        self.nodes = graph.node_count();
        self.edges = graph.edge_count();
        self.modules = graph
            .nodes()
            .filter(|node| node.kind == NodeKind::Module && !node.is_placeholder())
            .count();
    }

    pub fn record_diagnostics(&mut self, diagnostics: &[Diagnostic]) {
        self.diagnostics.clear();
        for diagnostic in diagnostics {
            *self
                .diagnostics
                .entry(diagnostic.category().to_string())
                .or_insert(0) += 1;
        }
    }

    pub fn diagnostic_count(&self) -> usize {
        self.diagnostics.values().sum()
    }
}
