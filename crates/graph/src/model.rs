//! Entity model: the closed table of which edge kinds may connect which node kinds.
//!
//! | Edge kind | Sources        | Targets                  |
//! |-----------|----------------|--------------------------|
//! | Contains  | Module, Class  | Class, Function, Method  |
//! | Imports   | Module         | Module                   |
//! | Calls     | Function, Method | Function, Method       |

use crate::types::{EdgeKind, NodeKind};

/// Allowed endpoint kinds for one edge kind
#[derive(Debug, Clone, Copy)]
pub struct Relationship {
    pub edge: EdgeKind,
    pub sources: &'static [NodeKind],
    pub targets: &'static [NodeKind],
}

pub const RELATIONSHIP_TABLE: [Relationship; 3] = [
    Relationship {
        edge: EdgeKind::Contains,
        sources: &[NodeKind::Module, NodeKind::Class],
        targets: &[NodeKind::Class, NodeKind::Function, NodeKind::Method],
    },
    Relationship {
        edge: EdgeKind::Imports,
        sources: &[NodeKind::Module],
        targets: &[NodeKind::Module],
    },
    Relationship {
        edge: EdgeKind::Calls,
        sources: &[NodeKind::Function, NodeKind::Method],
        targets: &[NodeKind::Function, NodeKind::Method],
    },
];

/// Which end of an edge a node sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Source,
    Target,
}

pub fn relationship(edge: EdgeKind) -> &'static Relationship {
    match edge {
        EdgeKind::Contains => &RELATIONSHIP_TABLE[0],
        EdgeKind::Imports => &RELATIONSHIP_TABLE[1],
        EdgeKind::Calls => &RELATIONSHIP_TABLE[2],
    }
}

/// Check `source -[edge]-> target` against the relationship table
pub fn validate_edge(source: NodeKind, target: NodeKind, edge: EdgeKind) -> bool {
    allows_source(edge, source) && allows_target(edge, target)
}

pub fn allows_source(edge: EdgeKind, kind: NodeKind) -> bool {
    relationship(edge).sources.contains(&kind)
}

pub fn allows_target(edge: EdgeKind, kind: NodeKind) -> bool {
    relationship(edge).targets.contains(&kind)
}

/// Kind given to a placeholder synthesized for an undeclared endpoint
pub fn placeholder_kind(edge: EdgeKind, endpoint: Endpoint) -> NodeKind {
    match (edge, endpoint) {
        (EdgeKind::Imports, _) => NodeKind::Module,
        (EdgeKind::Calls, _) => NodeKind::Function,
        (EdgeKind::Contains, Endpoint::Source) => NodeKind::Module,
        (EdgeKind::Contains, Endpoint::Target) => NodeKind::Function,
    }
}

/// Whether a placeholder of kind `placeholder` may stand for a definition of kind `real`.
///
/// Call targets may turn out to be methods or classes (constructor calls).
pub fn resolves_to(placeholder: NodeKind, real: NodeKind) -> bool {
    match placeholder {
        NodeKind::Module => real == NodeKind::Module,
        NodeKind::Class => real == NodeKind::Class,
        NodeKind::Function | NodeKind::Method => matches!(
            real,
            NodeKind::Function | NodeKind::Method | NodeKind::Class
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn table_matches_allowed_triples() {
        let expected: BTreeSet<(NodeKind, NodeKind, EdgeKind)> = [
            (NodeKind::Module, NodeKind::Class, EdgeKind::Contains),
            (NodeKind::Module, NodeKind::Function, EdgeKind::Contains),
            (NodeKind::Module, NodeKind::Method, EdgeKind::Contains),
            (NodeKind::Class, NodeKind::Class, EdgeKind::Contains),
            (NodeKind::Class, NodeKind::Function, EdgeKind::Contains),
            (NodeKind::Class, NodeKind::Method, EdgeKind::Contains),
            (NodeKind::Module, NodeKind::Module, EdgeKind::Imports),
            (NodeKind::Function, NodeKind::Function, EdgeKind::Calls),
            (NodeKind::Function, NodeKind::Method, EdgeKind::Calls),
            (NodeKind::Method, NodeKind::Function, EdgeKind::Calls),
            (NodeKind::Method, NodeKind::Method, EdgeKind::Calls),
        ]
        .into_iter()
        .collect();

        let mut allowed = BTreeSet::new();
        for source in NodeKind::ALL {
            for target in NodeKind::ALL {
                for edge in EdgeKind::ALL {
                    if validate_edge(source, target, edge) {
                        allowed.insert((source, target, edge));
                    }
                }
            }
        }
        assert_eq!(allowed, expected);
    }

    #[test]
    fn function_cannot_contain_module() {
        assert!(!validate_edge(NodeKind::Function, NodeKind::Module, EdgeKind::Contains));
    }

    #[test]
    fn placeholders_resolve_only_to_compatible_kinds() {
        assert!(resolves_to(NodeKind::Module, NodeKind::Module));
        assert!(!resolves_to(NodeKind::Module, NodeKind::Function));
        assert!(resolves_to(NodeKind::Function, NodeKind::Class));
        assert!(resolves_to(NodeKind::Method, NodeKind::Function));
    }
}
