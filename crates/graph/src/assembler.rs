use crate::diagnostics::Diagnostic;
use crate::merge::MergeEngine;
use crate::model::{self, Endpoint};
use crate::types::{Edge, EdgeKind, FileGraph, Node, NodeKind, ProjectGraph};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Final graph plus everything that went wrong on the way
#[derive(Debug, Clone, Default)]
pub struct AssembledGraph {
    pub graph: ProjectGraph,
    /// Sorted, so two runs over the same files compare equal
    pub diagnostics: Vec<Diagnostic>,
}

/// Single writer of the project graph.
///
/// Per-file graphs are ingested in any order. Nodes sharing an id are kept
/// side by side until [`GraphAssembler::finish`] reconciles them. An edge is
/// rejected on arrival only when its own batch defines both endpoints; every
/// other edge is judged once, against the merged kinds.
#[derive(Debug, Default)]
pub struct GraphAssembler {
    occurrences: BTreeMap<String, Vec<Node>>,
    edges: BTreeSet<Edge>,
    /// Edges whose endpoint kinds are only known after the merge
    pending: BTreeSet<Edge>,
    diagnostics: Vec<Diagnostic>,
    files: usize,
}

impl GraphAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing graph, e.g. to merge it again
    pub fn from_graph(graph: ProjectGraph) -> Self {
        let mut assembler = Self::new();
        for (id, node) in graph.nodes {
            assembler.occurrences.insert(id, vec![node]);
        }
        assembler.edges = graph.edges;
        assembler
    }

    /// Ingest one visited file
    pub fn ingest(&mut self, file: FileGraph) {
        log::debug!(
            "Ingesting {} ({} nodes, {} edges)",
            file.module_id,
            file.nodes.len(),
            file.edges.len()
        );
        self.ingest_parts(file.nodes, file.edges);
        self.files += 1;
    }

    /// Ingest a batch of nodes and the edges between them.
    ///
    /// Edges between two real nodes of the batch are validated right away.
    /// The rest wait for [`GraphAssembler::finish`], so the verdict never
    /// depends on which files happened to arrive first.
    pub fn ingest_parts(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        let mut declared: HashMap<String, NodeKind> = HashMap::with_capacity(nodes.len());
        for node in nodes.iter().filter(|node| !node.is_placeholder()) {
            declared.entry(node.id.clone()).or_insert(node.kind);
        }

        for node in nodes {
            self.insert_node(node);
        }
        for edge in edges {
            self.admit(edge, &declared);
        }
    }

    pub fn insert_node(&mut self, node: Node) {
        self.occurrences.entry(node.id.clone()).or_default().push(node);
    }

    /// Insert a single edge. Its endpoints are not known to be in the same
    /// batch, so it is always validated at [`GraphAssembler::finish`].
    pub fn insert_edge(&mut self, edge: Edge) {
        self.admit(edge, &HashMap::new());
    }

    /// Record a diagnostic produced outside the assembler (per-file failures)
    pub fn record(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn files_ingested(&self) -> usize {
        self.files
    }

    pub fn occurrence_count(&self, id: &str) -> usize {
        self.occurrences.get(id).map_or(0, Vec::len)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn admit(&mut self, edge: Edge, declared: &HashMap<String, NodeKind>) {
        let (Some(&source), Some(&target)) = (
            declared.get(&edge.source_id),
            declared.get(&edge.target_id),
        ) else {
            // Kinds of foreign ids are only settled by the merge
            self.pending.insert(edge);
            return;
        };

        // Calls to a class are settled by the constructor redirect in the sweep
        let constructor_call = edge.kind == EdgeKind::Calls
            && target == NodeKind::Class
            && model::allows_source(EdgeKind::Calls, source);

        if !constructor_call && !model::validate_edge(source, target, edge.kind) {
            let reason = rejection_reason(edge.kind, source, target);
            log::debug!("Rejected edge {edge}: {reason}");
            self.diagnostics
                .push(Diagnostic::InvalidEdgeError { edge, reason });
            return;
        }

        self.edges.insert(edge);
    }

    /// Resolve pending edges, merge duplicates, run the final validation sweep
    pub fn finish(mut self) -> AssembledGraph {
        let pending = std::mem::take(&mut self.pending);
        for edge in pending {
            for (id, endpoint) in [
                (&edge.source_id, Endpoint::Source),
                (&edge.target_id, Endpoint::Target),
            ] {
                if !self.occurrences.contains_key(id) {
                    let kind = model::placeholder_kind(edge.kind, endpoint);
                    self.insert_node(Node::placeholder(id.clone(), kind));
                }
            }
            self.edges.insert(edge);
        }

        let merged = MergeEngine::run(self.occurrences, self.edges);
        let mut diagnostics = self.diagnostics;
        diagnostics.extend(merged.diagnostics);

        let mut nodes = merged.nodes;
        let edges = validation_sweep(&nodes, merged.edges, &mut diagnostics);

        for edge in &edges {
            if nodes
                .get(&edge.target_id)
                .is_some_and(|node| node.is_placeholder())
            {
                diagnostics.push(Diagnostic::UnresolvedReferenceWarning { edge: edge.clone() });
            }
        }

        prune_orphan_placeholders(&mut nodes, &edges);

        diagnostics.sort();
        diagnostics.dedup();

        log::info!(
            "Assembled project graph from {} files: {} nodes, {} edges, {} diagnostics ({} placeholders resolved)",
            self.files,
            nodes.len(),
            edges.len(),
            diagnostics.len(),
            merged.resolved
        );

        AssembledGraph {
            graph: ProjectGraph::from_parts(nodes, edges),
            diagnostics,
        }
    }
}

/// Re-validate every edge against the kinds of the merged nodes.
///
/// A call that resolved to a class is redirected to its `__init__` when the
/// class defines one; every other violation is dropped and recorded.
fn validation_sweep(
    nodes: &BTreeMap<String, Node>,
    edges: BTreeSet<Edge>,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeSet<Edge> {
    let mut valid = BTreeSet::new();

    for edge in edges {
        let (Some(source), Some(target)) = (nodes.get(&edge.source_id), nodes.get(&edge.target_id))
        else {
            diagnostics.push(Diagnostic::InvalidEdgeError {
                edge,
                reason: "endpoint missing after merge".to_string(),
            });
            continue;
        };

        if model::validate_edge(source.kind, target.kind, edge.kind) {
            valid.insert(edge);
            continue;
        }

        if edge.kind == EdgeKind::Calls
            && target.kind == NodeKind::Class
            && model::allows_source(EdgeKind::Calls, source.kind)
        {
            let constructor = format!("{}.__init__", target.id);
            if nodes
                .get(&constructor)
                .is_some_and(|node| node.kind == NodeKind::Method)
            {
                valid.insert(Edge::calls(edge.source_id, constructor));
                continue;
            }
        }

        let reason = rejection_reason(edge.kind, source.kind, target.kind);
        diagnostics.push(Diagnostic::InvalidEdgeError { edge, reason });
    }

    valid
}

fn prune_orphan_placeholders(nodes: &mut BTreeMap<String, Node>, edges: &BTreeSet<Edge>) {
    let referenced: BTreeSet<&str> = edges
        .iter()
        .flat_map(|edge| [edge.source_id.as_str(), edge.target_id.as_str()])
        .collect();
    nodes.retain(|id, node| !node.is_placeholder() || referenced.contains(id.as_str()));
}

fn rejection_reason(edge: EdgeKind, source: NodeKind, target: NodeKind) -> String {
    format!("{edge} edge not allowed from {source} to {target}")
}
