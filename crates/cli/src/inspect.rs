use codemap_graph::{GraphError, GraphIndex, Node, RelatedNode, Result};
use serde::Serialize;

/// One node and its neighbourhood
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectReport<'a> {
    pub node: &'a Node,
    pub parent: Option<&'a str>,
    pub children: Vec<&'a str>,
    pub callers: Vec<&'a str>,
    pub callees: Vec<&'a str>,
    pub imports: Vec<&'a str>,
    pub importers: Vec<&'a str>,
    /// Non-containment edges touching the node
    pub coupling: usize,
    pub related: Vec<RelatedNode>,
}

pub fn inspect<'a>(index: &GraphIndex<'a>, id: &str, depth: usize) -> Result<InspectReport<'a>> {
    let node = index
        .graph()
        .node(id)
        .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

    Ok(InspectReport {
        node,
        parent: index.parent(id)?,
        children: index.children(id)?,
        callers: index.callers(id)?,
        callees: index.callees(id)?,
        imports: index.imports(id)?,
        importers: index.importers(id)?,
        coupling: index.coupling(id)?,
        related: index.related(id, depth)?,
    })
}
