//! End-to-end runs over on-disk projects

use codemap_graph::{Diagnostic, Edge, NodeKind, ATTR_ERROR};
use codemap_indexer::{IndexerConfig, IndexerError, ProjectIndexer, CONFIG_FILE_NAME};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn project(files: &[(&str, &[u8])]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (path, contents) in files {
        let full = temp.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, contents).unwrap();
    }
    temp
}

fn config(concurrency: usize) -> IndexerConfig {
    IndexerConfig {
        concurrency,
        ..IndexerConfig::default()
    }
}

async fn build(root: &Path, config: IndexerConfig) -> codemap_indexer::IndexOutcome {
    ProjectIndexer::new(root, config)
        .await
        .unwrap()
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn import_targets_real_module() {
    let temp = project(&[("a.py", b"import b\n"), ("b.py", b"VALUE = 1\n")]);
    let outcome = build(temp.path(), config(2)).await;

    assert!(outcome.graph.contains_edge(&Edge::imports("a", "b")));
    let b = outcome.graph.node("b").unwrap();
    assert_eq!(b.kind, NodeKind::Module);
    assert!(!b.is_placeholder());
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    assert_eq!(outcome.stats.files_scanned, 2);
    assert_eq!(outcome.stats.files_ingested, 2);
    assert_eq!(outcome.stats.modules, 2);
}

#[tokio::test]
async fn calls_across_files_resolve_in_any_order() {
    let temp = project(&[
        ("a.py", b"def main():\n    helper()\n"),
        ("b.py", b"def helper():\n    pass\n"),
        ("c.py", b"from b import helper\n\ndef run():\n    helper()\n"),
    ]);

    let first = build(temp.path(), config(4)).await;
    assert!(first.graph.contains_edge(&Edge::calls("a.main", "b.helper")));
    assert!(first.graph.contains_edge(&Edge::calls("c.run", "b.helper")));
    assert!(first.graph.contains_edge(&Edge::imports("c", "b")));
    assert!(first.graph.node("helper").is_none());
    assert!(first.graph.nodes().all(|node| !node.is_placeholder()));

    for _ in 0..5 {
        let again = build(temp.path(), config(4)).await;
        assert_eq!(again.graph, first.graph);
        assert_eq!(again.diagnostics, first.diagnostics);
    }

    let sequential = build(temp.path(), config(1)).await;
    assert_eq!(sequential.graph, first.graph);
}

#[tokio::test]
async fn stdlib_import_is_not_captured_by_package_module() {
    let temp = project(&[
        ("main.py", b"import logging\n"),
        ("app/__init__.py", b""),
        ("app/logging.py", b"def setup():\n    pass\n"),
    ]);
    let outcome = build(temp.path(), config(2)).await;

    assert!(outcome.graph.contains_edge(&Edge::imports("main", "logging")));
    assert!(!outcome.graph.contains_edge(&Edge::imports("main", "app.logging")));
    assert!(outcome.graph.node("logging").unwrap().is_external());
    assert_eq!(
        outcome.diagnostics,
        vec![Diagnostic::UnresolvedReferenceWarning {
            edge: Edge::imports("main", "logging"),
        }]
    );
}

#[tokio::test]
async fn stub_next_to_source_is_not_a_duplicate() {
    let temp = project(&[
        ("a.py", b"def f():\n    pass\n"),
        ("a.pyi", b"def f() -> None: ...\n"),
        ("b.pyi", b"def g() -> int: ...\n"),
    ]);
    let outcome = build(temp.path(), config(2)).await;

    assert_eq!(outcome.stats.files_scanned, 2);
    let f = outcome.graph.node("a.f").unwrap();
    assert_eq!(f.file_path.as_deref(), Some("a.py"));
    assert!(outcome.graph.node("b.g").is_some());
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
}

#[tokio::test]
async fn duplicate_module_definitions_warn() {
    let temp = project(&[
        ("pkg/mod.py", b"def run():\n    pass\n"),
        ("pkg/mod/__init__.py", b"\n\ndef run():\n    pass\n"),
    ]);
    let outcome = build(temp.path(), config(2)).await;

    let run = outcome.graph.node("pkg.mod.run").unwrap();
    assert_eq!(run.file_path.as_deref(), Some("pkg/mod.py"));
    assert_eq!(run.line_number, Some(1));

    let duplicates: Vec<(&str, &str, &str)> = outcome
        .diagnostics
        .iter()
        .filter_map(|diagnostic| match diagnostic {
            Diagnostic::DuplicateDefinitionWarning { id, kept, ignored } => {
                Some((id.as_str(), kept.as_str(), ignored.as_str()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        duplicates,
        vec![
            ("pkg.mod", "pkg/mod.py", "pkg/mod/__init__.py"),
            ("pkg.mod.run", "pkg/mod.py:1", "pkg/mod/__init__.py:3"),
        ]
    );
    assert_eq!(
        outcome.stats.diagnostics.get("duplicate_definition_warning"),
        Some(&2)
    );
}

#[tokio::test]
async fn parse_error_degrades_one_file() {
    let temp = project(&[
        ("bad.py", b"def broken(:\n    pass\n"),
        ("good.py", b"def ok():\n    pass\n"),
    ]);
    let mut config = config(2);
    config.fail_fast = true;
    let outcome = build(temp.path(), config).await;

    assert!(!outcome.is_aborted());
    assert_eq!(outcome.stats.files_ingested, 2);
    let bad = outcome.graph.node("bad").unwrap();
    assert_eq!(bad.attr_text(ATTR_ERROR), Some("syntax error at line 1"));
    assert!(outcome.graph.node("good.ok").is_some());
    assert!(matches!(
        outcome.diagnostics.as_slice(),
        [Diagnostic::ParseError { module_id, .. }] if module_id == "bad"
    ));
}

#[tokio::test]
async fn unmappable_path_is_reported_and_skipped() {
    let temp = project(&[
        ("0.bad/x.py", b"\n"),
        ("a.py", b"import b\n"),
        ("b.py", b"\n"),
    ]);
    let outcome = build(temp.path(), config(1)).await;

    assert!(!outcome.is_aborted());
    assert_eq!(outcome.stats.files_scanned, 3);
    assert_eq!(outcome.stats.files_ingested, 2);
    assert!(outcome.graph.contains_edge(&Edge::imports("a", "b")));
    assert!(matches!(
        outcome.diagnostics.as_slice(),
        [Diagnostic::PathError { .. }]
    ));
}

#[tokio::test]
async fn non_utf8_module_is_kept() {
    let temp = project(&[
        ("enc.py", b"# -*- coding: latin-1 -*-\nNAME = '\xe9'\n\ndef greet():\n    pass\n"),
        ("ok.py", b"import enc\n"),
    ]);
    let outcome = build(temp.path(), config(2)).await;

    assert_eq!(outcome.stats.files_ingested, 2);
    let enc = outcome.graph.node("enc").unwrap();
    assert!(!enc.is_placeholder());
    assert!(outcome.graph.node("enc.greet").is_some());
    assert!(outcome.graph.contains_edge(&Edge::imports("ok", "enc")));
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
}

#[tokio::test]
async fn fail_fast_stops_scheduling() {
    let temp = project(&[
        ("0.bad/x.py", b"\n"),
        ("a.py", b"import b\n"),
        ("b.py", b"\n"),
    ]);
    let mut config = config(1);
    config.fail_fast = true;
    let outcome = build(temp.path(), config).await;

    assert!(outcome.is_aborted());
    assert_eq!(outcome.stats.files_ingested, 0);
    assert!(outcome.graph.is_empty());
    assert_eq!(outcome.stats.diagnostics.get("path_error"), Some(&1));
}

#[tokio::test]
async fn invalid_root_is_fatal() {
    let temp = project(&[("a.py", b"\n")]);

    let missing = ProjectIndexer::new(temp.path().join("missing"), config(1)).await;
    assert!(matches!(missing, Err(IndexerError::InvalidRoot { .. })));

    let file = ProjectIndexer::new(temp.path().join("a.py"), config(1)).await;
    assert!(matches!(file, Err(IndexerError::InvalidRoot { .. })));
}

#[tokio::test]
async fn empty_root_is_a_valid_project() {
    let temp = TempDir::new().unwrap();
    let indexer = ProjectIndexer::new(temp.path(), config(1)).await.unwrap();
    let outcome = indexer.build().await.unwrap();
    assert_eq!(outcome.stats.files_scanned, 0);
    assert!(outcome.graph.is_empty());
    assert!(outcome.diagnostics.is_empty());
}

#[tokio::test]
async fn config_file_is_loaded_and_validated() {
    let temp = project(&[
        ("a.py", b"def f():\n    print('x')\n"),
        ("stubs.pyi", b"def g() -> int: ...\n"),
        (
            CONFIG_FILE_NAME,
            b"extensions = [\"py\"]\n\n[visitor]\nskip_builtin_calls = false\n",
        ),
    ]);
    let loaded = IndexerConfig::load(temp.path(), None).unwrap();
    assert_eq!(loaded.extensions, vec!["py".to_string()]);

    let outcome = build(temp.path(), loaded).await;
    assert_eq!(outcome.stats.files_scanned, 1);
    assert!(outcome.graph.contains_edge(&Edge::calls("a.f", "print")));

    let explicit = temp.path().join("broken.toml");
    fs::write(&explicit, "concurrency = 0\n").unwrap();
    let zero = IndexerConfig::load(temp.path(), Some(&explicit));
    let rejected = match zero {
        Ok(config) => ProjectIndexer::new(temp.path(), config).await.err(),
        Err(err) => Some(err),
    };
    assert!(matches!(rejected, Some(IndexerError::Config(_))));
}

#[tokio::test]
async fn outcome_serializes_with_diagnostics() {
    let temp = project(&[("a.py", b"import requests\n")]);
    let outcome = build(temp.path(), config(1)).await;

    let json: serde_json::Value = serde_json::from_str(&outcome.to_json(false).unwrap()).unwrap();
    assert_eq!(json["graph"]["version"], 1);
    assert_eq!(json["diagnostics"][0]["kind"], "unresolved_reference_warning");
    assert_eq!(json["stats"]["files_ingested"], 1);
}
