//! Build configuration parsing (hdme-build.toml)
//!
//! Provides structures and parsing for the extension build manifest.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the manifest file
    #[error("Failed to read build manifest: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse build manifest: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid build manifest: {0}")]
    ValidationError(String),
}

/// Build configuration (hdme-build.toml)
///
/// Every field has a default matching the stock hdme library layout, so an
/// empty manifest (or no manifest at all) describes a standard build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuildConfig {
    /// Extension name reported in the build target description
    pub extension_name: String,

    /// Library source tree, relative to the project root
    pub lib_dir: PathBuf,

    /// Data directory, relative to `lib_dir`
    pub data_subdir: PathBuf,

    /// Suffix identifying compilable sources
    pub source_suffix: String,

    /// Path segments excluding a source from compilation
    pub excluded_segments: Vec<String>,

    /// Runtime loader source, relative to `lib_dir`
    pub loader: PathBuf,

    /// Generated patched unit, relative to `lib_dir`
    pub generated: PathBuf,

    /// Link libraries required by the extension
    pub libraries: Vec<String>,

    /// Include directories, relative to the project root (defaults to `lib_dir`)
    #[serde(skip_serializing_if = "Option::is_none")]
    include_dirs: Option<Vec<PathBuf>>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            extension_name: "hdme".to_string(),
            lib_dir: PathBuf::from("lib"),
            data_subdir: PathBuf::from("hdme_data"),
            source_suffix: ".c".to_string(),
            excluded_segments: vec![
                "test".to_string(),
                "examples".to_string(),
                "time".to_string(),
                "programs".to_string(),
            ],
            loader: PathBuf::from("hdme_data/hdme_data_read.c"),
            generated: PathBuf::from("hdme_data/hdme_data_inline.c"),
            libraries: vec![
                "arb".to_string(),
                "flint".to_string(),
                "mpfr".to_string(),
                "gmp".to_string(),
                "pthread".to_string(),
                "m".to_string(),
            ],
            include_dirs: None,
        }
    }
}

impl BuildConfig {
    /// Load a configuration from a TOML manifest file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: BuildConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration, falling back to defaults when the manifest is absent
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate field combinations that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extension_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "extension_name must not be empty".to_string(),
            ));
        }
        if self.source_suffix.is_empty() || !self.source_suffix.starts_with('.') {
            return Err(ConfigError::ValidationError(format!(
                "source_suffix must start with '.': {:?}",
                self.source_suffix
            )));
        }
        if self.loader == self.generated {
            return Err(ConfigError::ValidationError(
                "loader and generated unit must be distinct paths".to_string(),
            ));
        }
        for seg in &self.excluded_segments {
            if seg.is_empty() || seg.contains('/') {
                return Err(ConfigError::ValidationError(format!(
                    "excluded segment must be a single directory name: {:?}",
                    seg
                )));
            }
        }
        Ok(())
    }

    /// Absolute path of the library tree under `root`
    pub fn lib_path(&self, root: &Path) -> PathBuf {
        root.join(&self.lib_dir)
    }

    /// Absolute path of the data directory under `root`
    pub fn data_path(&self, root: &Path) -> PathBuf {
        self.lib_path(root).join(&self.data_subdir)
    }

    /// Absolute path of the runtime loader source under `root`
    pub fn loader_path(&self, root: &Path) -> PathBuf {
        self.lib_path(root).join(&self.loader)
    }

    /// Absolute path of the generated patched unit under `root`
    pub fn generated_path(&self, root: &Path) -> PathBuf {
        self.lib_path(root).join(&self.generated)
    }

    /// Include directories for the build target; when the manifest leaves
    /// them unset they follow `lib_dir`
    pub fn include_dirs(&self) -> Vec<PathBuf> {
        match &self.include_dirs {
            Some(dirs) => dirs.clone(),
            None => vec![self.lib_dir.clone()],
        }
    }
}
