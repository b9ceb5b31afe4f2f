//! Properties of the assembled project graph: determinism, idempotence,
//! uniqueness, validity and document round-trip

use codemap_graph::{
    validate_edge, AssembledGraph, Diagnostic, Edge, EdgeKind, FileGraph, GraphAssembler, Node,
    NodeKind, ProjectGraph,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;

fn module(id: &str, path: &str) -> Node {
    Node::new(id, NodeKind::Module, codemap_graph::short_name(id)).with_file(path)
}

fn def(id: &str, kind: NodeKind, path: &str, line: usize) -> Node {
    Node::new(id, kind, codemap_graph::short_name(id))
        .with_file(path)
        .at_line(line)
}

fn file(module_id: &str, nodes: Vec<Node>, edges: Vec<Edge>) -> FileGraph {
    FileGraph {
        module_id: module_id.to_string(),
        nodes,
        edges,
    }
}

fn fixture() -> Vec<FileGraph> {
    vec![
        file(
            "pkg.a",
            vec![
                module("pkg.a", "pkg/a.py"),
                def("pkg.a.main", NodeKind::Function, "pkg/a.py", 4),
            ],
            vec![
                Edge::contains("pkg.a", "pkg.a.main"),
                Edge::imports("pkg.a", "b"),
                Edge::calls("pkg.a.main", "b.helper"),
                Edge::calls("pkg.a.main", "pkg.a.main"),
            ],
        ),
        file(
            "pkg.b",
            vec![
                module("pkg.b", "pkg/b.py"),
                def("pkg.b.helper", NodeKind::Function, "pkg/b.py", 1),
                def("pkg.b.Client", NodeKind::Class, "pkg/b.py", 5),
                def("pkg.b.Client.__init__", NodeKind::Method, "pkg/b.py", 6),
            ],
            vec![
                Edge::contains("pkg.b", "pkg.b.helper"),
                Edge::contains("pkg.b", "pkg.b.Client"),
                Edge::contains("pkg.b.Client", "pkg.b.Client.__init__"),
            ],
        ),
        file(
            "pkg.c",
            vec![
                module("pkg.c", "pkg/c.py"),
                def("pkg.c.run", NodeKind::Function, "pkg/c.py", 3),
            ],
            vec![
                Edge::contains("pkg.c", "pkg.c.run"),
                Edge::imports("pkg.c", "requests"),
                Edge::calls("pkg.c.run", "pkg.b.Client"),
                Edge::calls("pkg.c.run", "pkg.a.main"),
                Edge::calls("pkg.c.run", "pkg.mod.sub"),
            ],
        ),
        file(
            "pkg.mod",
            vec![
                module("pkg.mod", "pkg/mod.py"),
                def("pkg.mod.run", NodeKind::Function, "pkg/mod.py", 2),
                def("pkg.mod.sub", NodeKind::Function, "pkg/mod.py", 5),
            ],
            vec![
                Edge::contains("pkg.mod", "pkg.mod.run"),
                Edge::contains("pkg.mod", "pkg.mod.sub"),
            ],
        ),
        file(
            "pkg.mod",
            vec![
                module("pkg.mod", "pkg/mod/__init__.py"),
                def("pkg.mod.run", NodeKind::Function, "pkg/mod/__init__.py", 9),
            ],
            vec![
                Edge::contains("pkg.mod", "pkg.mod.run"),
                Edge::contains("pkg.mod.run", "pkg.mod"),
            ],
        ),
        // Same id as the function `pkg.mod.sub` in pkg/mod.py, which sorts first
        file(
            "pkg.mod.sub",
            vec![
                module("pkg.mod.sub", "pkg/mod/sub.py"),
                def("pkg.mod.sub.x", NodeKind::Function, "pkg/mod/sub.py", 1),
            ],
            vec![Edge::contains("pkg.mod.sub", "pkg.mod.sub.x")],
        ),
    ]
}

fn assemble(files: impl IntoIterator<Item = FileGraph>) -> AssembledGraph {
    let mut assembler = GraphAssembler::new();
    for file in files {
        assembler.ingest(file);
    }
    assembler.finish()
}

fn permutations(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut result = Vec::new();
    for smaller in permutations(n - 1) {
        for position in 0..=smaller.len() {
            let mut order = smaller.clone();
            order.insert(position, n - 1);
            result.push(order);
        }
    }
    result
}

#[test]
fn result_is_independent_of_ingestion_order() {
    let files = fixture();
    let baseline = assemble(files.clone());

    let orders = permutations(files.len());
    assert_eq!(orders.len(), 720);
    for order in orders {
        let shuffled = order.iter().map(|&i| files[i].clone());
        let assembled = assemble(shuffled);
        assert_eq!(assembled.graph, baseline.graph, "order {order:?}");
        assert_eq!(assembled.diagnostics, baseline.diagnostics, "order {order:?}");
    }
}

#[test]
fn merging_a_merged_graph_is_a_no_op() {
    let first = assemble(fixture());
    let again = GraphAssembler::from_graph(first.graph.clone()).finish();
    assert_eq!(again.graph, first.graph);
    assert!(again
        .diagnostics
        .iter()
        .all(|d| matches!(d, Diagnostic::UnresolvedReferenceWarning { .. })));
}

#[test]
fn ids_are_unique_and_edges_valid() {
    let graph = assemble(fixture()).graph;

    let mut seen = HashSet::new();
    for node in graph.nodes() {
        assert!(seen.insert(node.id.clone()), "duplicate id {}", node.id);
    }

    for edge in graph.edges() {
        let source = graph.node(&edge.source_id).expect("source exists");
        let target = graph.node(&edge.target_id).expect("target exists");
        assert!(
            validate_edge(source.kind, target.kind, edge.kind),
            "invalid edge {edge}"
        );
    }
}

#[test]
fn document_round_trip_preserves_graph() {
    let graph = assemble(fixture()).graph;
    let json = graph.to_json(true).unwrap();
    let restored = ProjectGraph::from_json(&json).unwrap();
    assert_eq!(restored, graph);
    assert_eq!(restored.to_document(), graph.to_document());
}

#[test]
fn forward_references_resolve_to_real_definitions() {
    let graph = assemble(fixture()).graph;

    assert!(graph.contains_edge(&Edge::imports("pkg.a", "pkg.b")));
    assert!(graph.contains_edge(&Edge::calls("pkg.a.main", "pkg.b.helper")));
    assert!(graph.node("b").is_none());
    assert!(graph.node("b.helper").is_none());

    // Recursion stays a self-loop
    assert!(graph.contains_edge(&Edge::calls("pkg.a.main", "pkg.a.main")));
    // Constructor call lands on __init__
    assert!(graph.contains_edge(&Edge::calls("pkg.c.run", "pkg.b.Client.__init__")));
}

#[test]
fn calls_follow_the_merged_kind_of_a_colliding_id() {
    let files = fixture();
    for order in permutations(files.len()) {
        let assembled = assemble(order.iter().map(|&i| files[i].clone()));
        let graph = &assembled.graph;
        assert_eq!(graph.node("pkg.mod.sub").unwrap().kind, NodeKind::Function);
        assert!(
            graph.contains_edge(&Edge::calls("pkg.c.run", "pkg.mod.sub")),
            "order {order:?}"
        );
        assert!(!graph.contains_edge(&Edge::contains("pkg.mod.sub", "pkg.mod.sub.x")));
    }
}

#[test]
fn diagnostics_cover_every_degraded_fact() {
    let assembled = assemble(fixture());

    assert_eq!(
        assembled.diagnostics,
        vec![
            Diagnostic::InvalidEdgeError {
                edge: Edge::contains("pkg.mod.run", "pkg.mod"),
                reason: "contains edge not allowed from function to module".to_string(),
            },
            Diagnostic::InvalidEdgeError {
                edge: Edge::contains("pkg.mod.sub", "pkg.mod.sub.x"),
                reason: "contains edge not allowed from function to function".to_string(),
            },
            Diagnostic::UnresolvedReferenceWarning {
                edge: Edge::imports("pkg.c", "requests"),
            },
            Diagnostic::DuplicateDefinitionWarning {
                id: "pkg.mod".to_string(),
                kept: "pkg/mod.py".to_string(),
                ignored: "pkg/mod/__init__.py".to_string(),
            },
            Diagnostic::DuplicateDefinitionWarning {
                id: "pkg.mod.run".to_string(),
                kept: "pkg/mod.py:2".to_string(),
                ignored: "pkg/mod/__init__.py:9".to_string(),
            },
            Diagnostic::DuplicateDefinitionWarning {
                id: "pkg.mod.sub".to_string(),
                kept: "pkg/mod.py:5".to_string(),
                ignored: "pkg/mod/sub.py".to_string(),
            },
        ]
    );

    let requests = assembled.graph.node("requests").unwrap();
    assert!(requests.is_external());
    assert!(!assembled
        .graph
        .contains_edge(&Edge::new("pkg.mod.run", "pkg.mod", EdgeKind::Contains)));
}
