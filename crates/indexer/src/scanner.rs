use crate::config::IndexerConfig;
use codemap_visitor::Language;
use ignore::WalkBuilder;
use std::collections::btree_map::{BTreeMap, Entry};
use std::path::{Path, PathBuf};

/// What the scanner keeps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub include_hidden: bool,
    pub max_file_bytes: u64,
    /// Lowercase extensions without the dot, in priority order: a file is
    /// dropped when a sibling with the same stem has an earlier extension
    pub extensions: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&IndexerConfig::default())
    }
}

impl From<&IndexerConfig> for ScanOptions {
    fn from(config: &IndexerConfig) -> Self {
        Self {
            include_hidden: config.include_hidden,
            max_file_bytes: config.max_file_bytes,
            extensions: config
                .extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
        }
    }
}

/// Scanner for finding source files in a project
pub struct FileScanner {
    root: PathBuf,
    options: ScanOptions,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_options(root, ScanOptions::default())
    }

    pub fn with_options(root: impl AsRef<Path>, options: ScanOptions) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            options,
        }
    }

    /// Scan directory for source files (.gitignore aware), sorted by path
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(!self.options.include_hidden)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false);
        builder.filter_entry(move |entry| !FileScanner::is_ignored_scope(entry.path(), &root));

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    if !self.is_source_file(path) {
                        continue;
                    }

                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > self.options.max_file_bytes {
                            log::debug!(
                                "Skipping large file {} ({} bytes > {})",
                                path.display(),
                                meta.len(),
                                self.options.max_file_bytes
                            );
                            continue;
                        }
                    }

                    files.push(path.to_path_buf());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        let mut files = self.drop_shadowed(files);
        files.sort();
        log::info!("Found {} source files", files.len());
        files
    }

    /// Keep one file per module path, e.g. `a.py` over its stub `a.pyi`
    fn drop_shadowed(&self, files: Vec<PathBuf>) -> Vec<PathBuf> {
        let mut by_stem: BTreeMap<PathBuf, (usize, PathBuf)> = BTreeMap::new();
        for path in files {
            let rank = self.extension_rank(&path).unwrap_or(usize::MAX);
            match by_stem.entry(path.with_extension("")) {
                Entry::Vacant(slot) => {
                    slot.insert((rank, path));
                }
                Entry::Occupied(mut slot) => {
                    let (kept_rank, kept) = slot.get();
                    if (rank, &path) < (*kept_rank, kept) {
                        log::debug!("{} shadows {}", path.display(), kept.display());
                        slot.insert((rank, path));
                    } else {
                        log::debug!("{} shadows {}", kept.display(), path.display());
                    }
                }
            }
        }
        by_stem.into_values().map(|(_, path)| path).collect()
    }

    fn extension_rank(&self, path: &Path) -> Option<usize> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.options
            .extensions
            .iter()
            .position(|candidate| candidate == &ext)
    }

    fn is_source_file(&self, path: &Path) -> bool {
        self.extension_rank(path).is_some() && Language::from_path(path).is_ok()
    }

    fn is_ignored_scope(path: &Path, root: &Path) -> bool {
        if let Ok(relative) = path.strip_prefix(root) {
            for component in relative.components() {
                if let std::path::Component::Normal(name) = component {
                    let lowered = name.to_string_lossy().to_lowercase();
                    if IGNORED_SCOPES.iter().any(|ignored| ignored == &lowered) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

const IGNORED_SCOPES: &[&str] = &[
    // VCS / tooling
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    // virtualenvs / installed packages
    ".venv",
    "venv",
    ".tox",
    ".nox",
    "site-packages",
    ".eggs",
    "node_modules",
    // caches / builds
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    ".cache",
    "build",
    "dist",
];
