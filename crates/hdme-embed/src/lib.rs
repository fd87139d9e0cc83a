//! hdme Extension Build Library
//!
//! This crate prepares the hdme C library for compilation as a loadable
//! extension, including:
//! - Source tree collection (partitioning sources from data resources)
//! - Compile-time data embedding (byte-array constants plus lookup table)
//! - Runtime-loader patching with a scoped apply/undo lifecycle
//! - Build-target description for the external build driver

pub mod collect;
pub mod config;
pub mod embed;
pub mod extension;
pub mod patch;

pub use collect::{CollectError, Collector, SourceTree};
pub use config::{BuildConfig, ConfigError};
pub use embed::{EmbedError, EmbeddedResource, EmbeddedTable, Resource, LOOKUP_FUNCTION};
pub use extension::{CompilationUnit, ExtensionDescriptor, ExtensionError, UnitKind};
pub use patch::{LoaderSource, PatchError, PatchGuard, Patcher, StatementKind, BACKUP_SUFFIX};
