//! Merge/dedup engine.
//!
//! Collapses every representation of one logical entity into a single
//! canonical node and rewrites incident edges to the surviving id:
//!
//! 1. occurrences sharing an id collapse (real definition beats placeholder;
//!    between real definitions the smallest `(file, line)` wins and the
//!    conflict is reported);
//! 2. placeholders whose id names a real entity by a dotted suffix are
//!    unioned with that entity, unless the part before the suffix is itself a
//!    project module (a name inside a real package is only reachable by its
//!    full id, so `logging` never becomes `app.logging`);
//! 3. edges are rewritten through the union-find representatives.
//!
//! Running the engine over its own output changes nothing.

use crate::diagnostics::Diagnostic;
use crate::model;
use crate::types::{Edge, Node, NodeKind, ATTR_EXTERNAL};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Result of a merge pass
#[derive(Debug, Default)]
pub struct MergeOutput {
    pub nodes: BTreeMap<String, Node>,
    pub edges: BTreeSet<Edge>,
    pub diagnostics: Vec<Diagnostic>,
    /// Placeholders absorbed into a real node by suffix resolution
    pub resolved: usize,
}

/// Union-find over node ids
#[derive(Debug, Default)]
struct IdUnionFind {
    parent: HashMap<String, String>,
}

impl IdUnionFind {
    fn find(&mut self, id: &str) -> String {
        let mut root = id.to_string();
        while let Some(parent) = self.parent.get(&root) {
            if parent == &root {
                break;
            }
            root = parent.clone();
        }

        // Path compression
        let mut current = id.to_string();
        while current != root {
            let next = self
                .parent
                .insert(current.clone(), root.clone())
                .unwrap_or_else(|| root.clone());
            current = next;
        }

        root
    }

    /// Make `canonical`'s representative the representative of `absorbed`
    fn union_into(&mut self, absorbed: &str, canonical: &str) {
        let absorbed_root = self.find(absorbed);
        let canonical_root = self.find(canonical);
        if absorbed_root != canonical_root {
            self.parent.insert(absorbed_root, canonical_root);
        }
    }
}

pub struct MergeEngine;

impl MergeEngine {
    /// Merge node occurrences (multiset keyed by id) and edges into one graph
    pub fn run(occurrences: BTreeMap<String, Vec<Node>>, edges: BTreeSet<Edge>) -> MergeOutput {
        let mut diagnostics = Vec::new();

        let mut nodes = BTreeMap::new();
        for (id, group) in occurrences {
            if let Some(node) = collapse_occurrences(&id, group, &mut diagnostics) {
                nodes.insert(id, node);
            }
        }

        let mut union_find = IdUnionFind::default();
        let resolved = resolve_placeholders(&mut nodes, &mut union_find);

        let edges = edges
            .into_iter()
            .map(|edge| Edge {
                source_id: union_find.find(&edge.source_id),
                target_id: union_find.find(&edge.target_id),
                kind: edge.kind,
            })
            .collect();

        MergeOutput {
            nodes,
            edges,
            diagnostics,
            resolved,
        }
    }
}

/// Pick the canonical occurrence of an id and fold the others into it
fn collapse_occurrences(
    id: &str,
    mut group: Vec<Node>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Node> {
    group.sort_by(|a, b| canonical_order(a).cmp(&canonical_order(b)));
    let mut occurrences = group.into_iter();
    let mut canonical = occurrences.next()?;

    for other in occurrences {
        if !canonical.is_placeholder() && !other.is_placeholder() {
            log::debug!(
                "Duplicate definition of {id}: keeping {}, ignoring {}",
                canonical.location(),
                other.location()
            );
            diagnostics.push(Diagnostic::DuplicateDefinitionWarning {
                id: id.to_string(),
                kept: canonical.location(),
                ignored: other.location(),
            });
        }
        absorb_attributes(&mut canonical, other);
    }

    Some(canonical)
}

/// Real definitions first (by file, then line), placeholders last (by kind)
fn canonical_order(node: &Node) -> (bool, Option<&str>, Option<usize>, NodeKind) {
    (
        node.is_placeholder(),
        node.file_path.as_deref(),
        node.line_number,
        node.kind,
    )
}

fn absorb_attributes(canonical: &mut Node, absorbed: Node) {
    for (key, value) in absorbed.attributes {
        canonical.attributes.entry(key).or_insert(value);
    }
    if !canonical.is_placeholder() {
        canonical.attributes.remove(ATTR_EXTERNAL);
    }
}

/// Union each placeholder with the real node its id names by dotted suffix
fn resolve_placeholders(
    nodes: &mut BTreeMap<String, Node>,
    union_find: &mut IdUnionFind,
) -> usize {
    let mut by_suffix: HashMap<&str, Vec<&Node>> = HashMap::new();
    let mut packages: HashSet<&str> = HashSet::new();
    for node in nodes.values().filter(|node| !node.is_placeholder()) {
        for (idx, _) in node.id.match_indices('.') {
            by_suffix.entry(&node.id[idx + 1..]).or_default().push(node);
        }
        if node.kind == NodeKind::Module {
            packages.insert(node.id.as_str());
        }
    }

    let mut matches: Vec<(String, String)> = Vec::new();
    for placeholder in nodes.values().filter(|node| node.is_placeholder()) {
        let Some(candidates) = by_suffix.get(placeholder.id.as_str()) else {
            continue;
        };
        // Bare call names stay loose; module paths must not reach into a package
        let scoped = placeholder.kind == NodeKind::Module || placeholder.id.contains('.');
        let best = candidates
            .iter()
            .filter(|candidate| model::resolves_to(placeholder.kind, candidate.kind))
            .filter(|candidate| {
                let prefix = &candidate.id[..candidate.id.len() - placeholder.id.len() - 1];
                !scoped || !packages.contains(prefix)
            })
            .min_by(|a, b| {
                let a_key = (a.id.matches('.').count(), a.id.as_str());
                let b_key = (b.id.matches('.').count(), b.id.as_str());
                a_key.cmp(&b_key)
            });
        if let Some(best) = best {
            if candidates.len() > 1 {
                log::debug!(
                    "Placeholder {} has {} candidates, chose {}",
                    placeholder.id,
                    candidates.len(),
                    best.id
                );
            }
            matches.push((placeholder.id.clone(), best.id.clone()));
        }
    }

    for (placeholder_id, real_id) in &matches {
        log::debug!("Resolved placeholder {placeholder_id} -> {real_id}");
        union_find.union_into(placeholder_id, real_id);
        nodes.remove(placeholder_id);
    }

    matches.len()
}
