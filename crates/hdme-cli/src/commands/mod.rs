//! CLI subcommand implementations.

pub mod apply;
pub mod embed;
pub mod package;
pub mod plan;
pub mod undo;

use anyhow::Context;
use hdme_embed::BuildConfig;
use std::path::{Path, PathBuf};

/// Manifest file looked up under the project root when none is given
pub const DEFAULT_MANIFEST: &str = "hdme-build.toml";

/// Load the build configuration for a command invocation.
///
/// An explicitly named manifest must exist; the default manifest may be
/// absent, in which case the stock hdme layout is assumed.
pub fn load_config(root: &Path, manifest: Option<&Path>) -> anyhow::Result<BuildConfig> {
    match manifest {
        Some(path) => {
            let path: PathBuf = if path.is_absolute() {
                path.to_path_buf()
            } else {
                root.join(path)
            };
            BuildConfig::load(&path)
                .with_context(|| format!("Failed to load build manifest {}", path.display()))
        }
        None => {
            let path = root.join(DEFAULT_MANIFEST);
            BuildConfig::load_or_default(&path)
                .with_context(|| format!("Failed to load build manifest {}", path.display()))
        }
    }
}

/// Resolve a user-supplied output path: relative paths land under the
/// project root, absolute paths are taken as-is.
pub fn resolve_under_root(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_under_root_relative() {
        let resolved = resolve_under_root(Path::new("/project"), Path::new("out/table.c"));
        assert_eq!(resolved, PathBuf::from("/project/out/table.c"));
    }

    #[test]
    fn test_resolve_under_root_absolute() {
        let resolved = resolve_under_root(Path::new("/project"), Path::new("/tmp/table.c"));
        assert_eq!(resolved, PathBuf::from("/tmp/table.c"));
    }
}
