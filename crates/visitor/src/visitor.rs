use crate::config::VisitorConfig;
use crate::error::VisitorError;
use crate::parser::PythonParser;
use codemap_graph::{
    short_name, Diagnostic, Edge, FileGraph, Node, NodeKind, ATTR_BASES, ATTR_DECORATORS,
    ATTR_DOCSTRING, ATTR_END_LINE, ATTR_HAS_DOCSTRING, ATTR_IS_ASYNC, ATTR_PARAMETER_COUNT,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use tree_sitter::{Node as SyntaxNode, Tree};

/// Names that resolve to Python builtins unless shadowed
const BUILTINS: &[&str] = &[
    "abs", "all", "any", "ascii", "bin", "bool", "breakpoint", "bytearray", "bytes", "callable",
    "chr", "classmethod", "compile", "complex", "delattr", "dict", "dir", "divmod", "enumerate",
    "eval", "exec", "filter", "float", "format", "frozenset", "getattr", "globals", "hasattr",
    "hash", "help", "hex", "id", "input", "int", "isinstance", "issubclass", "iter", "len", "list",
    "locals", "map", "max", "memoryview", "min", "next", "object", "oct", "open", "ord", "pow",
    "print", "property", "range", "repr", "reversed", "round", "set", "setattr", "slice",
    "sorted", "staticmethod", "str", "sum", "super", "tuple", "type", "vars", "zip",
    "AssertionError", "AttributeError", "Exception", "ImportError", "IndexError", "KeyError",
    "NotImplementedError", "OSError", "RuntimeError", "StopIteration", "TypeError", "ValueError",
];

/// Parameter node kinds counted towards `parameter_count`
const PARAMETER_KINDS: &[&str] = &[
    "identifier",
    "typed_parameter",
    "default_parameter",
    "typed_default_parameter",
    "list_splat_pattern",
    "dictionary_splat_pattern",
];

/// Graph and diagnostics for one visited file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub graph: FileGraph,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse and visit one file.
///
/// Never fails: a file that does not parse yields its module node tagged
/// with an `error` attribute plus a `ParseError` diagnostic.
pub fn visit_source(
    module_id: &str,
    rel_path: &str,
    source: &str,
    config: &VisitorConfig,
) -> FileOutcome {
    let parsed = PythonParser::new().and_then(|mut parser| parser.parse(source));
    match parsed {
        Ok(tree) => {
            let graph = SourceVisitor::new(module_id, rel_path, source, config).visit(&tree);
            log::debug!(
                "Visited {rel_path}: {} nodes, {} edges",
                graph.nodes.len(),
                graph.edges.len()
            );
            FileOutcome {
                graph,
                diagnostics: Vec::new(),
            }
        }
        Err(err) => {
            let message = match err {
                VisitorError::Parse(message) => message,
                other => other.to_string(),
            };
            log::warn!("{rel_path}: {message}");
            FileOutcome {
                graph: FileGraph::failed(module_id, rel_path, &message),
                diagnostics: vec![Diagnostic::ParseError {
                    module_id: module_id.to_string(),
                    file_path: rel_path.to_string(),
                    message,
                }],
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Module,
    Class,
}

/// Module-level definition a bare name can refer to
#[derive(Debug, Clone)]
enum TopLevel {
    Function(String),
    Class(String),
}

/// Call expression with a statically named callee
#[derive(Debug, Clone)]
struct CallSite {
    caller: String,
    /// Class of the enclosing method, for `self.`/`cls.` receivers
    class_id: Option<String>,
    /// `a.b.c()` -> ["a", "b", "c"]
    chain: Vec<String>,
}

/// Walks one parsed file and emits its nodes and edges.
///
/// Definitions are collected first; calls are resolved afterwards so a
/// function may call another defined further down the module.
pub struct SourceVisitor<'a> {
    module_id: &'a str,
    rel_path: &'a str,
    is_package: bool,
    source: &'a str,
    config: &'a VisitorConfig,
    nodes: Vec<Node>,
    edges: BTreeSet<Edge>,
    /// Import-bound name -> dotted target
    bindings: HashMap<String, String>,
    top_level: HashMap<String, TopLevel>,
    class_methods: HashMap<String, HashSet<String>>,
    /// Names local to each function: parameters and nested definitions
    function_locals: HashMap<String, HashSet<String>>,
    calls: Vec<CallSite>,
}

impl<'a> SourceVisitor<'a> {
    pub fn new(
        module_id: &'a str,
        rel_path: &'a str,
        source: &'a str,
        config: &'a VisitorConfig,
    ) -> Self {
        let is_package = rel_path
            .rsplit('/')
            .next()
            .is_some_and(|file| file.split('.').next() == Some("__init__"));
        Self {
            module_id,
            rel_path,
            is_package,
            source,
            config,
            nodes: Vec::new(),
            edges: BTreeSet::new(),
            bindings: HashMap::new(),
            top_level: HashMap::new(),
            class_methods: HashMap::new(),
            function_locals: HashMap::new(),
            calls: Vec::new(),
        }
    }

    pub fn visit(mut self, tree: &Tree) -> FileGraph {
        let root = tree.root_node();

        let mut module = Node::new(self.module_id, NodeKind::Module, short_name(self.module_id))
            .with_file(self.rel_path);
        if self.config.capture_docstrings {
            if let Some(doc) = self.docstring(root) {
                module.set_attr(ATTR_DOCSTRING, doc);
            }
        }
        self.nodes.push(module);

        self.walk_scope(root, self.module_id, ScopeKind::Module);
        self.resolve_calls();

        FileGraph {
            module_id: self.module_id.to_string(),
            nodes: self.nodes,
            edges: self.edges.into_iter().collect(),
        }
    }

    fn text(&self, node: SyntaxNode) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    /// Statements of a module or class body, including those nested in
    /// compound statements (`if`, `try`, `with`, ...)
    fn walk_scope(&mut self, node: SyntaxNode, scope_id: &str, kind: ScopeKind) {
        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();

        for child in children {
            match child.kind() {
                "class_definition" => self.visit_class(child, Vec::new(), scope_id, kind),
                "function_definition" => self.visit_function(child, Vec::new(), scope_id, kind),
                "decorated_definition" => self.visit_decorated(child, scope_id, kind),
                "import_statement" | "import_from_statement" => self.visit_import(child),
                _ => self.walk_scope(child, scope_id, kind),
            }
        }
    }

    fn visit_decorated(&mut self, node: SyntaxNode, scope_id: &str, kind: ScopeKind) {
        let mut cursor = node.walk();
        let decorators: Vec<String> = node
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "decorator")
            .filter_map(|decorator| self.decorator_name(decorator))
            .collect();

        let Some(definition) = node.child_by_field_name("definition") else {
            return;
        };
        match definition.kind() {
            "class_definition" => self.visit_class(definition, decorators, scope_id, kind),
            "function_definition" => self.visit_function(definition, decorators, scope_id, kind),
            _ => {}
        }
    }

    /// `@app.route("/")` -> `app.route`
    fn decorator_name(&self, decorator: SyntaxNode) -> Option<String> {
        let mut expr = decorator.named_child(0)?;
        if expr.kind() == "call" {
            expr = expr.child_by_field_name("function")?;
        }
        Some(self.text(expr).to_string())
    }

    fn visit_class(
        &mut self,
        node: SyntaxNode,
        decorators: Vec<String>,
        scope_id: &str,
        kind: ScopeKind,
    ) {
        let Some(name) = node.child_by_field_name("name").map(|n| self.text(n)) else {
            return;
        };
        let id = format!("{scope_id}.{name}");

        let bases: Vec<String> = node
            .child_by_field_name("superclasses")
            .map(|args| {
                let mut cursor = args.walk();
                args.named_children(&mut cursor)
                    .filter(|arg| !matches!(arg.kind(), "keyword_argument" | "comment"))
                    .map(|arg| self.text(arg).to_string())
                    .collect()
            })
            .unwrap_or_default();

        let body = node.child_by_field_name("body");
        let mut class = Node::new(id.as_str(), NodeKind::Class, name)
            .with_file(self.rel_path)
            .at_line(node.start_position().row + 1)
            .with_attr(ATTR_BASES, bases)
            .with_attr(ATTR_DECORATORS, decorators)
            .with_attr(ATTR_END_LINE, node.end_position().row + 1);
        if self.config.capture_docstrings {
            if let Some(doc) = body.and_then(|body| self.docstring(body)) {
                class.set_attr(ATTR_DOCSTRING, doc);
            }
        }

        self.nodes.push(class);
        self.edges.insert(Edge::contains(scope_id, id.as_str()));
        if kind == ScopeKind::Module {
            self.top_level
                .insert(name.to_string(), TopLevel::Class(id.clone()));
        }
        self.class_methods.entry(id.clone()).or_default();

        if let Some(body) = body {
            self.walk_scope(body, &id, ScopeKind::Class);
        }
    }

    fn visit_function(
        &mut self,
        node: SyntaxNode,
        decorators: Vec<String>,
        scope_id: &str,
        kind: ScopeKind,
    ) {
        let Some(name) = node.child_by_field_name("name").map(|n| self.text(n)) else {
            return;
        };
        let id = format!("{scope_id}.{name}");
        let node_kind = match kind {
            ScopeKind::Module => NodeKind::Function,
            ScopeKind::Class => NodeKind::Method,
        };

        let mut locals = HashSet::new();
        let mut parameter_count = 0usize;
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                if PARAMETER_KINDS.contains(&param.kind()) {
                    parameter_count += 1;
                    if let Some(name) = self.parameter_name(param) {
                        locals.insert(name.to_string());
                    }
                }
            }
        }

        let is_async = node.child(0).is_some_and(|first| first.kind() == "async");
        let body = node.child_by_field_name("body");
        let docstring = body.and_then(|body| self.docstring(body));

        let mut function = Node::new(id.as_str(), node_kind, name)
            .with_file(self.rel_path)
            .at_line(node.start_position().row + 1)
            .with_attr(ATTR_DECORATORS, decorators)
            .with_attr(ATTR_PARAMETER_COUNT, parameter_count)
            .with_attr(ATTR_HAS_DOCSTRING, docstring.is_some())
            .with_attr(ATTR_IS_ASYNC, is_async)
            .with_attr(ATTR_END_LINE, node.end_position().row + 1);
        if self.config.capture_docstrings {
            if let Some(doc) = docstring {
                function.set_attr(ATTR_DOCSTRING, doc);
            }
        }

        self.nodes.push(function);
        self.edges.insert(Edge::contains(scope_id, id.as_str()));

        let class_id = match kind {
            ScopeKind::Module => {
                self.top_level
                    .insert(name.to_string(), TopLevel::Function(id.clone()));
                None
            }
            ScopeKind::Class => {
                self.class_methods
                    .entry(scope_id.to_string())
                    .or_default()
                    .insert(name.to_string());
                Some(scope_id.to_string())
            }
        };

        if let Some(body) = body {
            self.collect_body(body, &id, class_id.as_deref(), &mut locals);
        }
        self.function_locals.insert(id, locals);
    }

    fn parameter_name(&self, param: SyntaxNode) -> Option<&'a str> {
        match param.kind() {
            "identifier" => Some(self.text(param)),
            "default_parameter" | "typed_default_parameter" => {
                param.child_by_field_name("name").map(|n| self.text(n))
            }
            _ => {
                let mut cursor = param.walk();
                let name = param
                    .named_children(&mut cursor)
                    .find(|child| child.kind() == "identifier");
                name.map(|n| self.text(n))
            }
        }
    }

    /// Calls, imports and nested definitions inside a function body.
    ///
    /// Nested functions and classes are not graph nodes; their names become
    /// locals and their calls count as calls of the enclosing function.
    fn collect_body(
        &mut self,
        node: SyntaxNode,
        caller: &str,
        class_id: Option<&str>,
        locals: &mut HashSet<String>,
    ) {
        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();

        for child in children {
            match child.kind() {
                "function_definition" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        locals.insert(self.text(name).to_string());
                    }
                    self.collect_body(child, caller, class_id, locals);
                }
                "class_definition" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        locals.insert(self.text(name).to_string());
                    }
                    // `self` inside a nested class is not the enclosing method's class
                    self.collect_body(child, caller, None, locals);
                }
                "import_statement" | "import_from_statement" => self.visit_import(child),
                "call" => {
                    if let Some(chain) = child
                        .child_by_field_name("function")
                        .and_then(|function| self.dotted_chain(function))
                    {
                        self.calls.push(CallSite {
                            caller: caller.to_string(),
                            class_id: class_id.map(str::to_string),
                            chain,
                        });
                    }
                    self.collect_body(child, caller, class_id, locals);
                }
                _ => self.collect_body(child, caller, class_id, locals),
            }
        }
    }

    /// `a.b.c` -> ["a", "b", "c"]; `None` for anything not a plain name chain
    fn dotted_chain(&self, node: SyntaxNode) -> Option<Vec<String>> {
        match node.kind() {
            "identifier" => Some(vec![self.text(node).to_string()]),
            "attribute" => {
                let mut chain = self.dotted_chain(node.child_by_field_name("object")?)?;
                chain.push(self.text(node.child_by_field_name("attribute")?).to_string());
                Some(chain)
            }
            _ => None,
        }
    }

    fn visit_import(&mut self, node: SyntaxNode) {
        let mut cursor = node.walk();
        let names: Vec<_> = node.children_by_field_name("name", &mut cursor).collect();

        if node.kind() == "import_statement" {
            for name in names {
                match name.kind() {
                    "dotted_name" => {
                        let target = self.text(name);
                        let head = target.split('.').next().unwrap_or(target);
                        self.bindings.insert(head.to_string(), head.to_string());
                        self.add_import(target);
                    }
                    "aliased_import" => {
                        let Some(target) = name.child_by_field_name("name").map(|n| self.text(n))
                        else {
                            continue;
                        };
                        if let Some(alias) = name.child_by_field_name("alias") {
                            let alias = self.text(alias).to_string();
                            self.bindings.insert(alias, target.to_string());
                        }
                        self.add_import(target);
                    }
                    _ => {}
                }
            }
            return;
        }

        let Some(module_name) = node.child_by_field_name("module_name") else {
            return;
        };
        let base = match module_name.kind() {
            "relative_import" => self.resolve_relative(module_name),
            _ => Some(self.text(module_name).to_string()),
        };

        let imported: Vec<(&'a str, &'a str)> = names
            .into_iter()
            .filter_map(|name| match name.kind() {
                "aliased_import" => {
                    let original = self.text(name.child_by_field_name("name")?);
                    let alias = name
                        .child_by_field_name("alias")
                        .map_or(original, |alias| self.text(alias));
                    Some((original, alias))
                }
                _ => {
                    let original = self.text(name);
                    Some((original, original))
                }
            })
            .collect();

        match base {
            Some(base) => {
                if base != self.module_id {
                    self.add_import(&base);
                }
                for (original, alias) in imported {
                    self.bindings
                        .insert(alias.to_string(), format!("{base}.{original}"));
                }
            }
            // `from . import x` above the root: each name stands for itself
            None => {
                for (original, alias) in imported {
                    self.bindings.insert(alias.to_string(), original.to_string());
                    self.add_import(original);
                }
            }
        }
    }

    fn add_import(&mut self, target: &str) {
        if !target.is_empty() {
            self.edges.insert(Edge::imports(self.module_id, target));
        }
    }

    /// Absolute dotted name of a relative import, against this module's package.
    ///
    /// Climbing above the project root keeps the written name.
    fn resolve_relative(&self, node: SyntaxNode) -> Option<String> {
        let mut cursor = node.walk();
        let mut level = 0;
        let mut written = None;
        for child in node.children(&mut cursor) {
            match child.kind() {
                "import_prefix" => level = self.text(child).matches('.').count(),
                "dotted_name" => written = Some(self.text(child).to_string()),
                _ => {}
            }
        }

        let mut package: Vec<&str> = self.module_id.split('.').collect();
        if !self.is_package {
            package.pop();
        }
        let climb = level.saturating_sub(1);
        if climb > package.len() {
            return written;
        }
        package.truncate(package.len() - climb);

        if let Some(written) = &written {
            package.push(written);
        }
        if package.is_empty() {
            None
        } else {
            Some(package.join("."))
        }
    }

    /// First statement of a body, if it is a string literal
    fn docstring(&self, body: SyntaxNode) -> Option<String> {
        let mut cursor = body.walk();
        let first = body
            .named_children(&mut cursor)
            .find(|child| child.kind() != "comment")?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let literal = first.named_child(0)?;
        (literal.kind() == "string").then(|| string_literal_value(self.text(literal)))
    }

    fn resolve_calls(&mut self) {
        let calls = std::mem::take(&mut self.calls);
        for call in calls {
            if let Some(target) = self.resolve_call(&call) {
                self.edges.insert(Edge::calls(call.caller, target));
            }
        }
    }

    /// Best-effort target id of a call; `None` when the callee is local,
    /// builtin or dynamic
    fn resolve_call(&self, call: &CallSite) -> Option<String> {
        let (head, rest) = call.chain.split_first()?;

        let is_local = self
            .function_locals
            .get(&call.caller)
            .is_some_and(|locals| locals.contains(head));
        if is_local {
            return None;
        }

        if rest.is_empty() {
            if let Some(definition) = self.top_level.get(head) {
                return match definition {
                    TopLevel::Function(id) => Some(id.clone()),
                    TopLevel::Class(id) => self.constructor_of(id),
                };
            }
            if let Some(bound) = self.bindings.get(head) {
                return Some(bound.clone());
            }
            if self.config.skip_builtin_calls && BUILTINS.contains(&head.as_str()) {
                return None;
            }
            return Some(head.clone());
        }

        if matches!(head.as_str(), "self" | "cls") {
            return match (rest, &call.class_id) {
                ([method], Some(class_id)) => Some(format!("{class_id}.{method}")),
                _ => None,
            };
        }

        match self.top_level.get(head) {
            Some(TopLevel::Class(class_id)) => {
                return match rest {
                    [method] => Some(format!("{class_id}.{method}")),
                    _ => None,
                };
            }
            Some(TopLevel::Function(_)) => return None,
            None => {}
        }

        self.bindings
            .get(head)
            .map(|bound| format!("{bound}.{}", rest.join(".")))
    }

    fn constructor_of(&self, class_id: &str) -> Option<String> {
        self.class_methods
            .get(class_id)
            .is_some_and(|methods| methods.contains("__init__"))
            .then(|| format!("{class_id}.__init__"))
    }
}

/// Text of a string literal without prefix and quotes
fn string_literal_value(raw: &str) -> String {
    let body = raw.trim_start_matches(|c: char| "rRbBuUfF".contains(c));
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return body[quote.len()..body.len() - quote.len()].trim().to_string();
        }
    }
    body.trim().to_string()
}
