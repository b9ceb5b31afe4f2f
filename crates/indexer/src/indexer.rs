use crate::config::IndexerConfig;
use crate::error::{IndexerError, Result};
use crate::scanner::{FileScanner, ScanOptions};
use crate::stats::IndexStats;
use codemap_graph::{
    AssembledGraph, Diagnostic, GraphAssembler, GraphDocument, GraphError, ProjectGraph,
};
use codemap_visitor::{resolve_module, visit_source, FileOutcome, PythonParser, VisitorConfig};
use serde::Serialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};

/// Graph, diagnostics and statistics of one run
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    pub graph: ProjectGraph,
    /// Sorted
    pub diagnostics: Vec<Diagnostic>,
    pub stats: IndexStats,
}

#[derive(Serialize)]
struct IndexReport<'a> {
    graph: GraphDocument,
    diagnostics: &'a [Diagnostic],
    stats: &'a IndexStats,
}

impl IndexOutcome {
    pub fn is_aborted(&self) -> bool {
        self.stats.aborted
    }

    /// `{graph, diagnostics, stats}` as JSON
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let report = IndexReport {
            graph: self.graph.to_document(),
            diagnostics: &self.diagnostics,
            stats: &self.stats,
        };
        let json = if pretty {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string(&report)
        };
        json.map_err(|e| IndexerError::Graph(GraphError::from(e)))
    }
}

/// What a worker hands to the assembler for one file
#[derive(Debug)]
enum FileResult {
    Visited(FileOutcome),
    /// Nothing to ingest; the file only contributes a diagnostic
    Skipped(Diagnostic),
}

impl FileResult {
    fn is_file_fatal(&self) -> bool {
        match self {
            FileResult::Visited(outcome) => {
                outcome.diagnostics.iter().any(Diagnostic::is_file_fatal)
            }
            FileResult::Skipped(diagnostic) => diagnostic.is_file_fatal(),
        }
    }
}

/// Builds the project graph: files are visited in parallel, a single task assembles
pub struct ProjectIndexer {
    root: PathBuf,
    config: IndexerConfig,
}

impl ProjectIndexer {
    /// Validate the configuration and the project root.
    ///
    /// A missing, unreadable or non-directory root is the only fatal run
    /// failure and is reported here, before any file is touched.
    pub async fn new(root: impl AsRef<Path>, config: IndexerConfig) -> Result<Self> {
        config.validate()?;

        let requested = root.as_ref();
        let root = tokio::fs::canonicalize(requested)
            .await
            .map_err(|e| IndexerError::invalid_root(requested, e))?;

        let metadata = tokio::fs::metadata(&root)
            .await
            .map_err(|e| IndexerError::invalid_root(&root, e))?;
        if !metadata.is_dir() {
            return Err(IndexerError::invalid_root(&root, "not a directory"));
        }
        // The scanner must be able to list the root
        let mut entries = tokio::fs::read_dir(&root)
            .await
            .map_err(|e| IndexerError::invalid_root(&root, e))?;
        entries
            .next_entry()
            .await
            .map_err(|e| IndexerError::invalid_root(&root, e))?;

        // Fail on a broken grammar before spawning workers
        PythonParser::new()?;

        Ok(Self { root, config })
    }

    /// Canonical project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Scan, visit and assemble the whole project
    pub async fn build(&self) -> Result<IndexOutcome> {
        let start = Instant::now();
        log::info!("Indexing project at {}", self.root.display());

        let scanner = FileScanner::with_options(&self.root, ScanOptions::from(&self.config));
        let files = scanner.scan();
        let mut stats = IndexStats::new(files.len());

        let concurrency = self.config.concurrency;
        let fail_fast = self.config.fail_fast;
        let (tx, mut rx) = mpsc::channel::<FileResult>(concurrency * 2);

        // Single writer: the only owner of the assembler
        let consumer = tokio::spawn(async move {
            let mut assembler = GraphAssembler::new();
            while let Some(result) = rx.recv().await {
                match result {
                    FileResult::Visited(outcome) => {
                        for diagnostic in outcome.diagnostics {
                            assembler.record(diagnostic);
                        }
                        assembler.ingest(outcome.graph);
                    }
                    FileResult::Skipped(diagnostic) => assembler.record(diagnostic),
                }
            }
            let files_ingested = assembler.files_ingested();
            (assembler.finish(), files_ingested)
        });

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let abort = Arc::new(AtomicBool::new(false));
        let visitor_config = Arc::new(self.config.visitor.clone());
        let root = Arc::new(self.root.clone());

        for path in files {
            if abort.load(Ordering::SeqCst) {
                break;
            }
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            // A worker may have failed while we waited for its permit
            if abort.load(Ordering::SeqCst) {
                break;
            }

            let tx = tx.clone();
            let abort = abort.clone();
            let root = root.clone();
            let visitor_config = visitor_config.clone();
            tokio::task::spawn_blocking(move || {
                let result = process_file(&root, &path, &visitor_config);
                if fail_fast && result.is_file_fatal() {
                    log::warn!("Stopping after failure in {}", path.display());
                    abort.store(true, Ordering::SeqCst);
                }
                if tx.blocking_send(result).is_err() {
                    log::debug!("Assembler gone, dropping {}", path.display());
                }
                drop(permit);
            });
        }
        drop(tx);

        let (assembled, files_ingested) = consumer.await.map_err(|e| {
            IndexerError::Io(std::io::Error::other(format!("assembler task failed: {e}")))
        })?;
        let AssembledGraph { graph, diagnostics } = assembled;

        stats.files_ingested = files_ingested;
        stats.aborted = abort.load(Ordering::SeqCst);
        stats.record_graph(&graph);
        stats.record_diagnostics(&diagnostics);
        stats.time_ms = start.elapsed().as_millis() as u64;

        if stats.aborted {
            log::warn!(
                "Indexing aborted: {} of {} files ingested",
                stats.files_ingested,
                stats.files_scanned
            );
        }
        log::info!(
            "Indexing completed: {} files, {} nodes, {} edges, {} diagnostics in {}ms",
            stats.files_ingested,
            stats.nodes,
            stats.edges,
            stats.diagnostic_count(),
            stats.time_ms
        );

        Ok(IndexOutcome {
            graph,
            diagnostics,
            stats,
        })
    }
}

/// Resolve, read and visit one file; runs on a blocking worker
fn process_file(root: &Path, path: &Path, config: &VisitorConfig) -> FileResult {
    log::debug!("Processing file: {}", path.display());

    let module = match resolve_module(root, path) {
        Ok(module) => module,
        Err(err) => {
            log::warn!("Skipping {}: {err}", path.display());
            return FileResult::Skipped(Diagnostic::PathError {
                path: path.display().to_string(),
                message: err.to_string(),
            });
        }
    };

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("Failed to read {}: {err}", module.relative_path);
            return FileResult::Skipped(Diagnostic::ReadError {
                file_path: module.relative_path,
                message: err.to_string(),
            });
        }
    };

    // Legacy encodings decode with replacement characters
    let source = String::from_utf8_lossy(&bytes);
    if matches!(source, Cow::Owned(_)) {
        log::debug!(
            "{} is not valid UTF-8, decoding lossily",
            module.relative_path
        );
    }

    FileResult::Visited(visit_source(
        &module.id,
        &module.relative_path,
        &source,
        config,
    ))
}
