use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Attribute holding the decorator names of a class or function
pub const ATTR_DECORATORS: &str = "decorators";
/// Attribute holding the base-class expressions of a class
pub const ATTR_BASES: &str = "bases";
/// Attribute holding docstring text
pub const ATTR_DOCSTRING: &str = "docstring";
/// `"true"`/`"false"`: whether a function carries a docstring
pub const ATTR_HAS_DOCSTRING: &str = "has_docstring";
/// Number of declared parameters of a function, as written
pub const ATTR_PARAMETER_COUNT: &str = "parameter_count";
/// `"true"` for `async def`
pub const ATTR_IS_ASYNC: &str = "is_async";
/// Last line of a class or function definition
pub const ATTR_END_LINE: &str = "end_line";
/// Parse failure message recorded on a module node
pub const ATTR_ERROR: &str = "error";
/// `"true"` on placeholder nodes standing in for unresolved references
pub const ATTR_EXTERNAL: &str = "external";

/// Kind of code entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Module,
    Class,
    Function,
    Method,
}

impl NodeKind {
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Module,
        NodeKind::Class,
        NodeKind::Function,
        NodeKind::Method,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Class => "class",
            NodeKind::Function => "function",
            NodeKind::Method => "method",
        }
    }

    /// Functions and methods are the only entities that can call
    pub fn is_callable(self) -> bool {
        matches!(self, NodeKind::Function | NodeKind::Method)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of relationship between entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// A lexically contains B (module contains class, class contains method)
    Contains,

    /// Module A imports module B
    Imports,

    /// Function A calls function B
    Calls,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 3] = [EdgeKind::Contains, EdgeKind::Imports, EdgeKind::Calls];

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Imports => "imports",
            EdgeKind::Calls => "calls",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute value: a single string or an ordered list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    List(Vec<String>),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(text) => Some(text),
            AttributeValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AttributeValue::List(items) => Some(items),
            AttributeValue::Text(_) => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<usize> for AttributeValue {
    fn from(value: usize) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        AttributeValue::List(value)
    }
}

pub type Attributes = BTreeMap<String, AttributeValue>;

/// Code entity (module, class, function or method)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Fully qualified dotted id (e.g. "pkg.mod.ClassName.method_name")
    pub id: String,

    pub kind: NodeKind,

    /// Unqualified name
    pub name: String,

    /// Root-relative source path; absent on placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    /// 1-based first line of the definition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,

    #[serde(default)]
    pub attributes: Attributes,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            file_path: None,
            line_number: None,
            attributes: Attributes::new(),
        }
    }

    /// Stand-in for a referenced entity whose definition has not been found
    pub fn placeholder(id: impl Into<String>, kind: NodeKind) -> Self {
        let id = id.into();
        let name = short_name(&id).to_string();
        Self::new(id, kind, name).with_attr(ATTR_EXTERNAL, "true")
    }

    pub fn with_file(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line_number = Some(line);
        self
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<AttributeValue>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn attr_text(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(AttributeValue::as_text)
    }

    pub fn attr_list(&self, key: &str) -> Option<&[String]> {
        self.attributes.get(key).and_then(AttributeValue::as_list)
    }

    /// A node without a source file is a placeholder, not a definition
    pub fn is_placeholder(&self) -> bool {
        self.file_path.is_none()
    }

    pub fn is_external(&self) -> bool {
        self.attr_text(ATTR_EXTERNAL) == Some("true")
    }

    /// "path:line" for diagnostics
    pub fn location(&self) -> String {
        match (&self.file_path, self.line_number) {
            (Some(path), Some(line)) => format!("{path}:{line}"),
            (Some(path), None) => path.clone(),
            (None, _) => format!("<external {}>", self.id),
        }
    }
}

/// Last dotted segment of an id
pub fn short_name(id: &str) -> &str {
    id.rsplit('.').next().unwrap_or(id)
}

/// Directed relationship between two node ids
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
        }
    }

    pub fn contains(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::new(source_id, target_id, EdgeKind::Contains)
    }

    pub fn imports(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::new(source_id, target_id, EdgeKind::Imports)
    }

    pub fn calls(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::new(source_id, target_id, EdgeKind::Calls)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source_id, self.kind, self.target_id)
    }
}

/// Nodes and edges produced by visiting one source file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileGraph {
    pub module_id: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl FileGraph {
    pub fn new(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Module node only, tagged with the parse failure
    pub fn failed(module_id: &str, file_path: &str, message: &str) -> Self {
        let module = Node::new(module_id, NodeKind::Module, short_name(module_id))
            .with_file(file_path)
            .with_attr(ATTR_ERROR, message);
        Self {
            module_id: module_id.to_string(),
            nodes: vec![module],
            edges: Vec::new(),
        }
    }
}

/// Project-wide graph: node id -> node, plus the edge set
///
/// Mutation is reserved to the assembler; consumers only read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectGraph {
    pub(crate) nodes: BTreeMap<String, Node>,
    pub(crate) edges: BTreeSet<Edge>,
}

impl ProjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(nodes: BTreeMap<String, Node>, edges: BTreeSet<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes, ordered by id
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges, ordered by (source, target, kind)
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.edges.contains(edge)
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.source_id == id)
    }

    pub fn edges_to<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.target_id == id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_external_without_file() {
        let node = Node::placeholder("os.path", NodeKind::Module);
        assert!(node.is_placeholder());
        assert!(node.is_external());
        assert_eq!(node.name, "path");
        assert_eq!(node.location(), "<external os.path>");
    }

    #[test]
    fn failed_file_graph_has_only_module() {
        let graph = FileGraph::failed("pkg.broken", "pkg/broken.py", "syntax error at line 3");
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
        let module = &graph.nodes[0];
        assert_eq!(module.name, "broken");
        assert_eq!(module.attr_text(ATTR_ERROR), Some("syntax error at line 3"));
        assert!(!module.is_placeholder());
    }

    #[test]
    fn node_serializes_with_documented_field_names() {
        let node = Node::new("pkg.mod.run", NodeKind::Function, "run")
            .with_file("pkg/mod.py")
            .at_line(4)
            .with_attr(ATTR_DECORATORS, vec!["cached".to_string()]);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["id"], "pkg.mod.run");
        assert_eq!(value["kind"], "function");
        assert_eq!(value["filePath"], "pkg/mod.py");
        assert_eq!(value["lineNumber"], 4);
        assert_eq!(value["attributes"]["decorators"][0], "cached");

        let edge = serde_json::to_value(Edge::calls("a.f", "b.g")).unwrap();
        assert_eq!(edge["sourceId"], "a.f");
        assert_eq!(edge["targetId"], "b.g");
        assert_eq!(edge["kind"], "calls");
    }

    #[test]
    fn placeholder_omits_absent_location() {
        let value = serde_json::to_value(Node::placeholder("requests", NodeKind::Module)).unwrap();
        assert!(value.get("filePath").is_none());
        assert!(value.get("lineNumber").is_none());
        assert_eq!(value["attributes"]["external"], "true");
    }
}
