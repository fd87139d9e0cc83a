//! Source tree collection
//!
//! Walks the library tree and partitions discovered files into compilable
//! sources and embeddable data resources. The traversal is a pure read and
//! the output ordering is sorted, so generated artifacts are reproducible
//! across builds.

use crate::config::BuildConfig;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during source collection
#[derive(Debug, Error)]
pub enum CollectError {
    /// Library root directory does not exist
    #[error("Library directory does not exist: {0}")]
    MissingRoot(PathBuf),

    /// Data directory does not exist
    #[error("Data directory does not exist: {0}")]
    MissingDataDir(PathBuf),

    /// A discovered path was not valid UTF-8 and cannot key a table entry
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    /// Malformed traversal pattern
    #[error("Invalid traversal pattern: {0}")]
    PatternError(#[from] glob::PatternError),

    /// Failure while walking the tree
    #[error("Failed to walk library tree: {0}")]
    GlobError(#[from] glob::GlobError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Partition of the library tree produced by [`Collector::collect`]
///
/// `sources` are relative to the library directory; `resources` are relative
/// to the data directory and double as the lookup keys of the embedded table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    /// Compilable sources, sorted, relative to `lib_dir`
    pub sources: Vec<PathBuf>,

    /// Data resource files, sorted, relative to the data directory
    pub resources: Vec<PathBuf>,
}

/// Library tree collector
pub struct Collector<'a> {
    config: &'a BuildConfig,
    root: PathBuf,
}

impl<'a> Collector<'a> {
    /// Create a collector rooted at the project directory
    pub fn new(config: &'a BuildConfig, root: &Path) -> Self {
        Self {
            config,
            root: root.to_path_buf(),
        }
    }

    /// Walk the full library tree and partition its files
    pub fn collect(&self) -> Result<SourceTree, CollectError> {
        let lib = self.config.lib_path(&self.root);
        if !lib.is_dir() {
            return Err(CollectError::MissingRoot(lib));
        }
        let data = self.config.data_path(&self.root);
        if !data.is_dir() {
            return Err(CollectError::MissingDataDir(data));
        }

        let pattern = format!("{}/**/*", glob_escape(&lib)?);
        let mut sources = Vec::new();
        let mut resources = Vec::new();

        for entry in glob::glob(&pattern)? {
            let path = entry?;
            if !path.is_file() {
                continue;
            }

            let Ok(rel) = path.strip_prefix(&lib) else {
                continue;
            };
            if rel.to_str().is_none() {
                return Err(CollectError::NonUtf8Path(path.clone()));
            }

            if self.is_source(rel) {
                if !self.is_excluded(rel) {
                    sources.push(rel.to_path_buf());
                }
            } else if let Ok(key) = path.strip_prefix(&data) {
                resources.push(key.to_path_buf());
            }
        }

        sources.sort();
        resources.sort();
        Ok(SourceTree { sources, resources })
    }

    fn is_source(&self, rel: &Path) -> bool {
        rel.to_str()
            .map(|s| s.ends_with(&self.config.source_suffix))
            .unwrap_or(false)
    }

    fn is_excluded(&self, rel: &Path) -> bool {
        rel.components().any(|c| match c {
            Component::Normal(name) => name
                .to_str()
                .map(|n| self.config.excluded_segments.iter().any(|e| e == n))
                .unwrap_or(false),
            _ => false,
        })
    }
}

/// Escape glob metacharacters in a literal directory prefix
fn glob_escape(path: &Path) -> Result<String, CollectError> {
    let text = path
        .to_str()
        .ok_or_else(|| CollectError::NonUtf8Path(path.to_path_buf()))?;
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '*' | '?' | '[' | ']' => {
                escaped.push('[');
                escaped.push(ch);
                escaped.push(']');
            }
            _ => escaped.push(ch),
        }
    }
    Ok(escaped)
}
