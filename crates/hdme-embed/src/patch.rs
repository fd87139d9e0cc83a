//! Runtime-loader patching
//!
//! Rewrites the library's runtime data loader so it answers from the embedded
//! table instead of the filesystem. The rewrite is structural rather than
//! textual: the loader is parsed into a small list of statement categories and
//! the I/O category is disabled line by line, so a loader whose shape drifts
//! from expectations fails loudly instead of being silently half-patched.
//!
//! The patch is modeled as a scoped filesystem acquisition: `apply` moves the
//! original loader to a backup and writes the patched unit, `undo` is the
//! release that restores the tree. [`PatchGuard`] runs the release on drop so
//! a failing build cannot leave the tree mutated.

use crate::config::BuildConfig;
use crate::embed::{EmbeddedTable, LOOKUP_FUNCTION};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix of the loader backup created while a patch is applied
pub const BACKUP_SUFFIX: &str = ".orig";

/// Errors that can occur while applying or undoing a patch
#[derive(Debug, Error)]
pub enum PatchError {
    /// Loader source absent at apply time
    #[error("Runtime loader source does not exist: {0}")]
    LoaderMissing(PathBuf),

    /// The success-assignment marker was not found
    #[error("No success-assignment statement found in {0}; refusing to patch")]
    MarkerNotFound(PathBuf),

    /// The success-assignment marker matched more than once
    #[error("Found {count} success-assignment statements in {path}; expected exactly one")]
    MarkerAmbiguous { path: PathBuf, count: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Category assigned to each loader line by structural classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `#include` of a file-I/O header
    FileApiInclude,
    /// Declaration of a file handle
    FileHandleDecl,
    /// Call into the file API (open, format, scan, close)
    IoCall,
    /// Use of a declared file handle outside a direct API call
    HandleUse,
    /// The single statement assigning the success indicator
    SuccessAssignment,
    /// Anything else, emitted unchanged
    Passthrough,
}

/// A parsed loader source: every line paired with its category
#[derive(Debug, Clone)]
pub struct LoaderSource {
    lines: Vec<(StatementKind, String)>,
}

impl LoaderSource {
    /// Classify each line of the loader text
    pub fn parse(text: &str) -> Self {
        let mut lines: Vec<(StatementKind, String)> = text
            .lines()
            .map(|line| (classify(line), line.to_string()))
            .collect();

        // Second pass: lines touching a declared file handle outside a
        // recognized API call still carry I/O intent and must be disabled
        let handles: Vec<String> = lines
            .iter()
            .filter(|(kind, _)| *kind == StatementKind::FileHandleDecl)
            .filter_map(|(_, line)| handle_name(line))
            .collect();
        for (kind, line) in &mut lines {
            if *kind == StatementKind::Passthrough
                && handles.iter().any(|h| contains_word(line, h))
            {
                *kind = StatementKind::HandleUse;
            }
        }

        Self { lines }
    }

    /// Number of success-assignment markers found
    pub fn marker_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|(kind, _)| *kind == StatementKind::SuccessAssignment)
            .count()
    }

    pub fn lines(&self) -> impl Iterator<Item = (StatementKind, &str)> + '_ {
        self.lines.iter().map(|(kind, line)| (*kind, line.as_str()))
    }

    /// Emit the patched unit: generated declarations first, then the loader
    /// body with I/O disabled and the marker replaced by a table lookup
    ///
    /// The marker must have been verified to occur exactly once.
    pub fn render_patched(&self, table: &EmbeddedTable) -> String {
        let mut out = table.render_c();
        out.push('\n');
        for (kind, line) in &self.lines {
            match kind {
                StatementKind::Passthrough => {
                    out.push_str(line);
                    out.push('\n');
                }
                StatementKind::SuccessAssignment => {
                    let indent: String = line
                        .chars()
                        .take_while(|c| c.is_whitespace())
                        .collect();
                    let lhs = line
                        .trim()
                        .split('=')
                        .next()
                        .map(str::trim)
                        .unwrap_or("success");
                    // Keyed by the logical name parameter, not the
                    // constructed filesystem path
                    out.push_str(&format!(
                        "{}{} = {}(str, name);\n",
                        indent, lhs, LOOKUP_FUNCTION
                    ));
                }
                _ => {
                    out.push_str("// ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        out
    }
}

fn classify(line: &str) -> StatementKind {
    let trimmed = line.trim();
    if is_success_assignment(trimmed) {
        return StatementKind::SuccessAssignment;
    }
    if trimmed.starts_with("#include") && trimmed.contains("stdio.h") {
        return StatementKind::FileApiInclude;
    }
    if trimmed.starts_with("FILE") {
        return StatementKind::FileHandleDecl;
    }
    const IO_CALLS: [&str; 7] = [
        "fopen(", "fclose(", "fscanf(", "fgets(", "fprintf(", "sprintf(", "snprintf(",
    ];
    if IO_CALLS.iter().any(|call| trimmed.contains(call)) {
        return StatementKind::IoCall;
    }
    StatementKind::Passthrough
}

/// A line is the marker when it assigns (not compares) to `success`
fn is_success_assignment(trimmed: &str) -> bool {
    let Some(rest) = trimmed.strip_prefix("success") else {
        return false;
    };
    let rest = rest.trim_start();
    rest.starts_with('=') && !rest.starts_with("==")
}

/// Extract the handle identifier from a `FILE* name ...` declaration
fn handle_name(line: &str) -> Option<String> {
    let rest = line.trim().strip_prefix("FILE")?;
    let rest = rest.trim_start_matches(|c: char| c == '*' || c.is_whitespace());
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Whole-word containment, so a handle named `file` does not match `filename`
fn contains_word(line: &str, word: &str) -> bool {
    let bytes = line.as_bytes();
    let mut start = 0;
    while let Some(pos) = line[start..].find(word) {
        let begin = start + pos;
        let end = begin + word.len();
        let left_ok = begin == 0 || !is_ident_byte(bytes[begin - 1]);
        let right_ok = end == bytes.len() || !is_ident_byte(bytes[end]);
        if left_ok && right_ok {
            return true;
        }
        start = begin + 1;
    }
    false
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Patch lifecycle over the loader, generated unit and backup paths
pub struct Patcher {
    loader: PathBuf,
    generated: PathBuf,
    backup: PathBuf,
}

impl Patcher {
    /// Create a patcher for the configured loader under the project root
    pub fn new(config: &BuildConfig, root: &Path) -> Self {
        Self::from_paths(config.loader_path(root), config.generated_path(root))
    }

    /// Create a patcher from explicit loader and generated-unit paths
    pub fn from_paths(loader: PathBuf, generated: PathBuf) -> Self {
        let mut backup = loader.clone().into_os_string();
        backup.push(BACKUP_SUFFIX);
        Self {
            loader,
            generated,
            backup: PathBuf::from(backup),
        }
    }

    pub fn loader_path(&self) -> &Path {
        &self.loader
    }

    pub fn generated_path(&self) -> &Path {
        &self.generated
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Whether a patch is currently applied (the backup exists)
    pub fn is_applied(&self) -> bool {
        self.backup.exists()
    }

    /// Apply the patch: back up the loader and write the patched unit
    ///
    /// Re-applying is safe: an existing backup is never overwritten, and the
    /// original text is always taken from the backup when one exists.
    pub fn apply(&self, table: &EmbeddedTable) -> Result<(), PatchError> {
        let original = if self.backup.exists() {
            std::fs::read_to_string(&self.backup)?
        } else if self.loader.exists() {
            std::fs::read_to_string(&self.loader)?
        } else {
            return Err(PatchError::LoaderMissing(self.loader.clone()));
        };

        let source = LoaderSource::parse(&original);
        match source.marker_count() {
            1 => {}
            0 => return Err(PatchError::MarkerNotFound(self.loader.clone())),
            count => {
                return Err(PatchError::MarkerAmbiguous {
                    path: self.loader.clone(),
                    count,
                })
            }
        }
        let patched = source.render_patched(table);

        // Structure verified; only now touch the tree
        let created_backup = !self.backup.exists();
        if created_backup {
            std::fs::rename(&self.loader, &self.backup)?;
        }
        if let Err(err) = std::fs::write(&self.generated, patched) {
            // A failed apply must not leave the tree half-patched: put the
            // loader back if this call was the one that moved it
            if created_backup {
                let _ = std::fs::rename(&self.backup, &self.loader);
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Apply the patch and return a guard that undoes it on drop
    pub fn apply_scoped(&self, table: &EmbeddedTable) -> Result<PatchGuard<'_>, PatchError> {
        self.apply(table)?;
        Ok(PatchGuard {
            patcher: self,
            armed: true,
        })
    }

    /// Undo the patch: restore the loader from backup and delete the
    /// generated unit and backup
    ///
    /// Returns `false` when the backup is absent (already clean).
    pub fn undo(&self) -> Result<bool, PatchError> {
        if !self.backup.exists() {
            return Ok(false);
        }
        std::fs::rename(&self.backup, &self.loader)?;
        if self.generated.exists() {
            std::fs::remove_file(&self.generated)?;
        }
        Ok(true)
    }
}

/// Scoped release for an applied patch
///
/// Dropping the guard undoes the patch, so the source tree is restored even
/// when a later build step fails. Call [`PatchGuard::persist`] to keep the
/// patch applied, or [`PatchGuard::undo`] to release eagerly and observe
/// errors.
pub struct PatchGuard<'a> {
    patcher: &'a Patcher,
    armed: bool,
}

impl PatchGuard<'_> {
    /// Release now, reporting any restore failure
    pub fn undo(mut self) -> Result<bool, PatchError> {
        self.armed = false;
        self.patcher.undo()
    }

    /// Keep the patch applied past the guard's lifetime
    pub fn persist(mut self) {
        self.armed = false;
    }
}

impl Drop for PatchGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.patcher.undo();
        }
    }
}
