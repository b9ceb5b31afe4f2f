//! Node/edge-list serialization of a [`ProjectGraph`].
//!
//! This is the contract with downstream consumers (renderers, graph
//! database exporters). Node and edge lists are emitted in id order so the
//! output is diff-friendly.

use crate::error::{GraphError, Result};
use crate::types::{Edge, Node, ProjectGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const GRAPH_DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub version: u32,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl ProjectGraph {
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            version: GRAPH_DOCUMENT_VERSION,
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
        }
    }

    /// Rebuild a graph from its node/edge lists.
    ///
    /// Rejects unknown versions, repeated node ids and edges whose endpoints
    /// are not in the node list. Repeated edges collapse.
    pub fn from_document(document: GraphDocument) -> Result<Self> {
        if document.version != GRAPH_DOCUMENT_VERSION {
            return Err(GraphError::UnsupportedVersion {
                found: document.version,
                expected: GRAPH_DOCUMENT_VERSION,
            });
        }

        let mut nodes = BTreeMap::new();
        for node in document.nodes {
            if nodes.contains_key(&node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
            nodes.insert(node.id.clone(), node);
        }

        let mut edges = BTreeSet::new();
        for edge in document.edges {
            for id in [&edge.source_id, &edge.target_id] {
                if !nodes.contains_key(id) {
                    return Err(GraphError::NodeNotFound(id.clone()));
                }
            }
            edges.insert(edge);
        }

        Ok(ProjectGraph::from_parts(nodes, edges))
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let document = self.to_document();
        let json = if pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: GraphDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }
}
