//! Extension build-target assembly
//!
//! Computes the final compilable-unit set (original sources minus the
//! superseded loader, plus the generated patched unit) and attaches the link
//! libraries and include directories the external build driver needs.

use crate::collect::SourceTree;
use crate::config::BuildConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while emitting a build target description
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// Failed to write the descriptor
    #[error("Failed to write extension descriptor: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to serialize the descriptor
    #[error("Failed to serialize extension descriptor: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Provenance of a compilation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Original,
    Generated,
}

/// One entry of the final unit set, path relative to the project root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub path: PathBuf,
    pub kind: UnitKind,
}

/// Build target description consumed by the external build driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDescriptor {
    pub name: String,
    pub sources: Vec<CompilationUnit>,
    pub libraries: Vec<String>,
    pub include_dirs: Vec<PathBuf>,
}

impl ExtensionDescriptor {
    /// Assemble the unit set from a collected tree
    ///
    /// The loader unit is always dropped and the generated unit always added
    /// exactly once, whether collection ran before or after the patch was
    /// applied.
    pub fn assemble(config: &BuildConfig, tree: &SourceTree) -> Self {
        let mut sources: Vec<CompilationUnit> = tree
            .sources
            .iter()
            .filter(|rel| **rel != config.loader && **rel != config.generated)
            .map(|rel| CompilationUnit {
                path: config.lib_dir.join(rel),
                kind: UnitKind::Original,
            })
            .collect();
        sources.push(CompilationUnit {
            path: config.lib_dir.join(&config.generated),
            kind: UnitKind::Generated,
        });
        sources.sort_by(|a, b| a.path.cmp(&b.path));

        Self {
            name: config.extension_name.clone(),
            sources,
            libraries: config.libraries.clone(),
            include_dirs: config.include_dirs(),
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ExtensionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON descriptor to `path`
    pub fn write_json(&self, path: &Path) -> Result<(), ExtensionError> {
        let mut text = self.to_json()?;
        text.push('\n');
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(sources: &[&str]) -> SourceTree {
        SourceTree {
            sources: sources.iter().map(PathBuf::from).collect(),
            resources: vec![],
        }
    }

    #[test]
    fn test_loader_replaced_by_generated_unit() {
        let config = BuildConfig::default();
        let descriptor = ExtensionDescriptor::assemble(
            &config,
            &tree(&["hdme_data/hdme_data_read.c", "igusa.c", "siegel/modeq.c"]),
        );

        let paths: Vec<&Path> = descriptor.sources.iter().map(|u| u.path.as_path()).collect();
        assert!(paths.contains(&Path::new("lib/hdme_data/hdme_data_inline.c")));
        assert!(!paths.contains(&Path::new("lib/hdme_data/hdme_data_read.c")));
        assert!(paths.contains(&Path::new("lib/igusa.c")));

        let generated: Vec<_> = descriptor
            .sources
            .iter()
            .filter(|u| u.kind == UnitKind::Generated)
            .collect();
        assert_eq!(generated.len(), 1);
    }

    #[test]
    fn test_generated_unit_never_duplicated() {
        // Collection after an applied patch already sees the generated unit
        let config = BuildConfig::default();
        let descriptor = ExtensionDescriptor::assemble(
            &config,
            &tree(&["hdme_data/hdme_data_inline.c", "igusa.c"]),
        );

        let count = descriptor
            .sources
            .iter()
            .filter(|u| u.path == Path::new("lib/hdme_data/hdme_data_inline.c"))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_libraries_and_includes_carried() {
        let config = BuildConfig::default();
        let descriptor = ExtensionDescriptor::assemble(&config, &tree(&[]));
        assert_eq!(descriptor.name, "hdme");
        assert_eq!(
            descriptor.libraries,
            vec!["arb", "flint", "mpfr", "gmp", "pthread", "m"]
        );
        assert_eq!(descriptor.include_dirs, vec![PathBuf::from("lib")]);
    }

    #[test]
    fn test_sources_sorted() {
        let config = BuildConfig::default();
        let descriptor =
            ExtensionDescriptor::assemble(&config, &tree(&["z.c", "a.c", "m/mid.c"]));
        let mut sorted = descriptor.sources.clone();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(descriptor.sources, sorted);
    }

    #[test]
    fn test_json_round_trip() {
        let config = BuildConfig::default();
        let descriptor = ExtensionDescriptor::assemble(&config, &tree(&["igusa.c"]));
        let json = descriptor.to_json().unwrap();
        let parsed: ExtensionDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, descriptor);
    }
}
