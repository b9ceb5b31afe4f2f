use crate::error::{IndexerError, Result};
use codemap_visitor::{Language, VisitorConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file picked up from the project root when no explicit path is given
pub const CONFIG_FILE_NAME: &str = "codemap.toml";

/// Environment override for the worker count
pub const CONCURRENCY_ENV: &str = "CODEMAP_CONCURRENCY";

const MAX_CONCURRENCY: usize = 32;

/// Configuration for one indexing run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Files visited at the same time
    pub concurrency: usize,

    /// Stop scheduling new files after the first path or read failure
    pub fail_fast: bool,

    /// Visit hidden files and directories
    pub include_hidden: bool,

    /// Larger files are skipped by the scanner
    pub max_file_bytes: u64,

    /// File extensions to visit, without the dot
    pub extensions: Vec<String>,

    pub visitor: VisitorConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            fail_fast: false,
            include_hidden: false,
            max_file_bytes: 1_048_576, // 1 MB
            extensions: vec!["py".to_string(), "pyi".to_string()],
            visitor: VisitorConfig::default(),
        }
    }
}

impl IndexerConfig {
    /// Defaults, then the TOML file, then the environment.
    ///
    /// `explicit` must exist; otherwise `codemap.toml` in `root` is used when present.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let candidate = root.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| IndexerError::config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&raw)
            .map_err(|e| IndexerError::config(format!("{}: {e}", path.display())))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| IndexerError::config(e.to_string()))
    }

    /// Apply `CODEMAP_CONCURRENCY`; unparsable values are ignored
    pub fn apply_env(&mut self) {
        let raw = std::env::var(CONCURRENCY_ENV).ok();
        if let Some(concurrency) = parse_concurrency(raw.as_deref()) {
            self.concurrency = concurrency;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(IndexerError::config(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.concurrency
            )));
        }
        if self.extensions.is_empty() {
            return Err(IndexerError::config("extensions must not be empty"));
        }
        if let Some(bad) = self
            .extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(IndexerError::config(format!(
                "extension {bad:?} must be non-empty and given without the leading dot"
            )));
        }
        for ext in &self.extensions {
            Language::from_extension(ext)
                .map_err(|e| IndexerError::config(format!("extension {ext:?}: {e}")))?;
        }
        if self.max_file_bytes == 0 {
            return Err(IndexerError::config("max_file_bytes must be positive"));
        }
        Ok(())
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_CONCURRENCY)
}

fn parse_concurrency(raw: Option<&str>) -> Option<usize> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .map(|v| v.clamp(1, MAX_CONCURRENCY))
}
