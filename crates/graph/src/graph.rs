use crate::error::{GraphError, Result};
use crate::types::{EdgeKind, Node, NodeKind, ProjectGraph};
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Node reached by [`GraphIndex::related`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedNode {
    pub id: String,
    pub distance: usize,
    /// Edge kinds walked from the start node
    pub path: Vec<EdgeKind>,
}

/// Aggregate counts over a project graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub placeholders: usize,
    pub nodes_by_kind: BTreeMap<NodeKind, usize>,
    pub edges_by_kind: BTreeMap<EdgeKind, usize>,
}

/// Read-only query index over a [`ProjectGraph`].
///
/// Holds a petgraph copy of the edge set so traversals do not scan the
/// whole edge list. Results are sorted by id.
pub struct GraphIndex<'a> {
    graph: &'a ProjectGraph,
    digraph: DiGraph<&'a str, EdgeKind>,
    indices: HashMap<&'a str, NodeIndex>,
}

impl<'a> GraphIndex<'a> {
    pub fn new(graph: &'a ProjectGraph) -> Self {
        let mut digraph = DiGraph::with_capacity(graph.node_count(), graph.edge_count());
        let mut indices = HashMap::with_capacity(graph.node_count());

        for node in graph.nodes() {
            let idx = digraph.add_node(node.id.as_str());
            indices.insert(node.id.as_str(), idx);
        }
        for edge in graph.edges() {
            if let (Some(&from), Some(&to)) = (
                indices.get(edge.source_id.as_str()),
                indices.get(edge.target_id.as_str()),
            ) {
                digraph.add_edge(from, to, edge.kind);
            }
        }

        Self {
            graph,
            digraph,
            indices,
        }
    }

    pub fn graph(&self) -> &'a ProjectGraph {
        self.graph
    }

    fn index_of(&self, id: &str) -> Result<NodeIndex> {
        self.indices
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    fn neighbors(&self, id: &str, kind: EdgeKind, direction: Direction) -> Result<Vec<&'a str>> {
        let idx = self.index_of(id)?;
        let mut ids: Vec<&'a str> = self
            .digraph
            .edges_directed(idx, direction)
            .filter(|e| *e.weight() == kind)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                self.digraph[other]
            })
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Functions and methods calling `id`
    pub fn callers(&self, id: &str) -> Result<Vec<&'a str>> {
        self.neighbors(id, EdgeKind::Calls, Direction::Incoming)
    }

    /// Functions and methods called by `id`
    pub fn callees(&self, id: &str) -> Result<Vec<&'a str>> {
        self.neighbors(id, EdgeKind::Calls, Direction::Outgoing)
    }

    /// Entities lexically contained in `id`
    pub fn children(&self, id: &str) -> Result<Vec<&'a str>> {
        self.neighbors(id, EdgeKind::Contains, Direction::Outgoing)
    }

    /// Container of `id`, if any
    pub fn parent(&self, id: &str) -> Result<Option<&'a str>> {
        Ok(self
            .neighbors(id, EdgeKind::Contains, Direction::Incoming)?
            .into_iter()
            .next())
    }

    pub fn imports(&self, id: &str) -> Result<Vec<&'a str>> {
        self.neighbors(id, EdgeKind::Imports, Direction::Outgoing)
    }

    pub fn importers(&self, id: &str) -> Result<Vec<&'a str>> {
        self.neighbors(id, EdgeKind::Imports, Direction::Incoming)
    }

    /// Nodes reachable from `id` over outgoing edges within `max_depth` hops.
    ///
    /// Breadth-first, so each node is reported at its shortest distance.
    pub fn related(&self, id: &str, max_depth: usize) -> Result<Vec<RelatedNode>> {
        let start = self.index_of(id)?;
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([(start, 0usize, Vec::new())]);
        let mut result = Vec::new();

        while let Some((current, depth, path)) = queue.pop_front() {
            if current != start {
                result.push(RelatedNode {
                    id: self.digraph[current].to_string(),
                    distance: depth,
                    path: path.clone(),
                });
            }
            if depth == max_depth {
                continue;
            }

            let mut next: Vec<_> = self
                .digraph
                .edges(current)
                .map(|e| (self.digraph[e.target()], e.target(), *e.weight()))
                .collect();
            next.sort();
            for (_, target, kind) in next {
                if visited.insert(target) {
                    let mut new_path = path.clone();
                    new_path.push(kind);
                    queue.push_back((target, depth + 1, new_path));
                }
            }
        }

        result.sort_by(|a, b| (a.distance, &a.id).cmp(&(b.distance, &b.id)));
        Ok(result)
    }

    /// Shortest directed path from `from` to `to`, both ends included
    pub fn find_path(&self, from: &str, to: &str) -> Result<Option<Vec<&'a str>>> {
        let start = self.index_of(from)?;
        let goal = self.index_of(to)?;
        let path = astar(&self.digraph, start, |n| n == goal, |_| 1usize, |_| 0)
            .map(|(_, nodes)| nodes.into_iter().map(|n| self.digraph[n]).collect());
        Ok(path)
    }

    /// Defined functions and methods nobody calls
    pub fn entry_points(&self) -> Vec<&'a Node> {
        self.graph
            .nodes()
            .filter(|node| node.kind.is_callable() && !node.is_placeholder())
            .filter(|node| {
                self.indices.get(node.id.as_str()).is_some_and(|&idx| {
                    !self
                        .digraph
                        .edges_directed(idx, Direction::Incoming)
                        .any(|e| *e.weight() == EdgeKind::Calls)
                })
            })
            .collect()
    }

    /// Incoming plus outgoing calls and imports of a node
    pub fn coupling(&self, id: &str) -> Result<usize> {
        let idx = self.index_of(id)?;
        let count = |direction| {
            self.digraph
                .edges_directed(idx, direction)
                .filter(|e| *e.weight() != EdgeKind::Contains)
                .count()
        };
        Ok(count(Direction::Incoming) + count(Direction::Outgoing))
    }

    /// Defined nodes with the highest coupling, ties broken by id
    pub fn hotspots(&self, limit: usize) -> Vec<(&'a str, usize)> {
        let mut scored: Vec<(&'a str, usize)> = self
            .graph
            .nodes()
            .filter(|node| !node.is_placeholder())
            .filter_map(|node| {
                let score = self.coupling(&node.id).ok()?;
                (score > 0).then_some((node.id.as_str(), score))
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        scored.truncate(limit);
        scored
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            nodes: self.graph.node_count(),
            edges: self.graph.edge_count(),
            ..GraphStats::default()
        };
        for node in self.graph.nodes() {
            *stats.nodes_by_kind.entry(node.kind).or_default() += 1;
            if node.is_placeholder() {
                stats.placeholders += 1;
            }
        }
        for edge in self.graph.edges() {
            *stats.edges_by_kind.entry(edge.kind).or_default() += 1;
        }
        stats
    }
}
