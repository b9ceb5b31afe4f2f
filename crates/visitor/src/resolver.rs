//! Path Resolver: file location within the project root -> canonical dotted id.
//!
//! `pkg/sub/mod.py` becomes `pkg.sub.mod`, `pkg/sub/__init__.py` becomes
//! `pkg.sub`. Components may not contain `.` themselves, so distinct
//! modules never share an id; `a.py` and `a/__init__.py` are the same module
//! to Python and resolve alike.

use crate::error::PathError;
use std::path::{Component, Path, PathBuf};

const PACKAGE_INDEX: &str = "__init__";

/// Canonical identity of one source file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModulePath {
    /// Dotted module id
    pub id: String,
    /// Root-relative path with `/` separators
    pub relative_path: String,
    /// File is a package index (`__init__`)
    pub is_package: bool,
}

/// Canonical module id of `file_path` under `project_root`
pub fn resolve(project_root: &Path, file_path: &Path) -> Result<String, PathError> {
    resolve_module(project_root, file_path).map(|module| module.id)
}

/// Like [`resolve`], also reporting the relative path and package status.
///
/// `file_path` may be absolute (under the root) or relative to the root.
pub fn resolve_module(project_root: &Path, file_path: &Path) -> Result<ModulePath, PathError> {
    let root = normalize(project_root).ok_or_else(|| outside(project_root, file_path))?;
    let full = if file_path.is_absolute() {
        file_path.to_path_buf()
    } else {
        root.join(file_path)
    };
    let full = normalize(&full).ok_or_else(|| outside(project_root, file_path))?;
    let relative = full
        .strip_prefix(&root)
        .map_err(|_| outside(project_root, file_path))?;

    let mut components = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| PathError::InvalidComponent {
                    path: file_path.to_path_buf(),
                    component: part.to_string_lossy().into_owned(),
                })?;
                components.push(part);
            }
            _ => return Err(outside(project_root, file_path)),
        }
    }

    let Some((&file_name, dirs)) = components.split_last() else {
        return Err(PathError::EmptyModulePath {
            path: file_path.to_path_buf(),
        });
    };
    let relative_path = components.join("/");

    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);

    let is_package = stem == PACKAGE_INDEX;
    let mut segments: Vec<&str> = dirs.to_vec();
    if !is_package {
        segments.push(stem);
    }

    for segment in &segments {
        if segment.is_empty() || segment.contains('.') {
            return Err(PathError::InvalidComponent {
                path: file_path.to_path_buf(),
                component: (*segment).to_string(),
            });
        }
    }

    let id = if segments.is_empty() {
        // Root-level package index names the root itself
        root.file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| PathError::EmptyModulePath {
                path: file_path.to_path_buf(),
            })?
    } else {
        segments.join(".")
    };

    Ok(ModulePath {
        id,
        relative_path,
        is_package,
    })
}

/// Lexically resolve `.` and `..`; `None` if `..` climbs past the start
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                normalized.pop();
                depth -= 1;
            }
            Component::Normal(part) => {
                normalized.push(part);
                depth += 1;
            }
            Component::RootDir | Component::Prefix(_) => normalized.push(component.as_os_str()),
        }
    }
    Some(normalized)
}

fn outside(root: &Path, path: &Path) -> PathError {
    PathError::OutsideRoot {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    }
}
