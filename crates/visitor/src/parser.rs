use crate::error::{Result, VisitorError};
use crate::language::Language;
use tree_sitter::{Node, Parser, Tree};

/// Tree-sitter front-end for Python sources.
///
/// A parser is not `Sync`; create one per worker.
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&Language::Python.tree_sitter_language())
            .map_err(|e| VisitorError::tree_sitter(format!("Failed to set language: {e}")))?;
        Ok(Self { parser })
    }

    /// Parse a whole file; any syntax error rejects the tree
    pub fn parse(&mut self, source: &str) -> Result<Tree> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| VisitorError::parse("parser produced no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            let message = match first_error_line(root) {
                Some(line) => format!("syntax error at line {line}"),
                None => "syntax error".to_string(),
            };
            return Err(VisitorError::Parse(message));
        }

        Ok(tree)
    }
}

/// 1-based line of the first ERROR or MISSING node, in document order
fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_valid_source() {
        let mut parser = PythonParser::new().unwrap();
        let tree = parser.parse("def f():\n    return 1\n").unwrap();
        assert_eq!(tree.root_node().kind(), "module");
    }

    #[test]
    fn test_reports_first_error_line() {
        let mut parser = PythonParser::new().unwrap();
        let err = parser
            .parse("import os\n\ndef broken(:\n    pass\n")
            .unwrap_err();
        assert!(matches!(err, VisitorError::Parse(msg) if msg == "syntax error at line 3"));
    }
}
