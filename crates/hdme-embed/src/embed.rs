//! Data-file embedding
//!
//! Converts data resource files into C byte-array constants plus a generated
//! linear-scan lookup function, so the library carries its reference data in
//! the compiled binary instead of reading it from disk at runtime. The data
//! set is small and fixed at build time, so a linear scan is enough.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the generated lookup function spliced into the patched loader
pub const LOOKUP_FUNCTION: &str = "hdme_data_inline_lookup";

/// Prefix of every generated byte-array identifier
const IDENT_PREFIX: &str = "hdme_data_";

/// Bytes per line in the rendered array literals
const BYTES_PER_LINE: usize = 12;

/// Errors that can occur while building the embedded table
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Failed to read a resource file
    #[error("Failed to read resource {key}: {source}")]
    IoError {
        key: String,
        source: std::io::Error,
    },

    /// Resource key is empty or escapes the data directory
    #[error("Invalid resource key: {0:?}")]
    InvalidKey(String),

    /// Two resources share the same key
    #[error("Duplicate resource key: {0:?}")]
    DuplicateKey(String),

    /// Two distinct keys map to the same generated identifier
    #[error("Resources {first:?} and {second:?} both map to identifier {identifier}")]
    IdentifierCollision {
        first: String,
        second: String,
        identifier: String,
    },
}

/// A data resource discovered under the data directory
///
/// Identity is the relative path, '/'-separated regardless of platform;
/// content is the raw byte sequence, read once and immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub key: String,
    pub bytes: Vec<u8>,
}

impl Resource {
    /// Read a resource from `data_dir` keyed by its relative path
    pub fn read(data_dir: &Path, rel: &Path) -> Result<Self, EmbedError> {
        let key = key_for_path(rel)?;
        let bytes = std::fs::read(data_dir.join(rel)).map_err(|source| EmbedError::IoError {
            key: key.clone(),
            source,
        })?;
        Ok(Self { key, bytes })
    }
}

/// One embedded entry: the resource plus its generated identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedResource {
    pub key: String,
    pub identifier: String,
    pub bytes: Vec<u8>,
}

/// The full set of embedded resources and the lookup model over them
///
/// `lookup` mirrors the success/failure contract of the generated C function
/// exactly: a present key yields its bytes, an absent key yields the failure
/// sentinel (`None` here, `0` in the generated code).
#[derive(Debug, Clone, Default)]
pub struct EmbeddedTable {
    entries: Vec<EmbeddedResource>,
}

impl EmbeddedTable {
    /// Build a table from resources, rejecting key and identifier collisions
    /// before any output is produced
    pub fn build(resources: Vec<Resource>) -> Result<Self, EmbedError> {
        let mut by_identifier: HashMap<String, String> = HashMap::new();
        let mut entries = Vec::with_capacity(resources.len());

        for resource in resources {
            let identifier = identifier_for_key(&resource.key);
            if let Some(first) = by_identifier.get(&identifier) {
                if *first == resource.key {
                    return Err(EmbedError::DuplicateKey(resource.key));
                }
                return Err(EmbedError::IdentifierCollision {
                    first: first.clone(),
                    second: resource.key,
                    identifier,
                });
            }
            by_identifier.insert(identifier.clone(), resource.key.clone());
            entries.push(EmbeddedResource {
                key: resource.key,
                identifier,
                bytes: resource.bytes,
            });
        }

        Ok(Self { entries })
    }

    /// Read and embed every resource listed relative to `data_dir`
    pub fn from_files(data_dir: &Path, rels: &[PathBuf]) -> Result<Self, EmbedError> {
        let resources = rels
            .iter()
            .map(|rel| Resource::read(data_dir, rel))
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(resources)
    }

    pub fn entries(&self) -> &[EmbeddedResource] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rust-side model of the generated linear-scan lookup
    pub fn lookup(&self, key: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.bytes.as_slice())
    }

    /// Render the embedded declarations, key/value tables and lookup function
    /// as a C source fragment
    pub fn render_c(&self) -> String {
        let mut out = String::new();
        out.push_str("/* Generated by hdme-build. Do not edit. */\n");
        out.push_str("#include <string.h>\n\n");

        for entry in &self.entries {
            render_audit_comment(&mut out, entry);
            render_byte_array(&mut out, entry);
            out.push('\n');
        }

        out.push_str("static const char* const hdme_data_inline_keys[] = {\n");
        for entry in &self.entries {
            let _ = writeln!(out, "    \"{}\",", c_escape(&entry.key));
        }
        out.push_str("};\n\n");

        out.push_str("static const unsigned char* const hdme_data_inline_values[] = {\n");
        for entry in &self.entries {
            let _ = writeln!(out, "    {},", entry.identifier);
        }
        out.push_str("};\n\n");

        let _ = writeln!(out, "#define HDME_DATA_INLINE_COUNT {}\n", self.entries.len());

        out.push_str("static int\n");
        let _ = writeln!(out, "{}(char* str, const char* name)", LOOKUP_FUNCTION);
        out.push_str("{\n");
        out.push_str("    int k;\n");
        out.push_str("    for (k = 0; k < HDME_DATA_INLINE_COUNT; k++)\n");
        out.push_str("    {\n");
        out.push_str("        if (strcmp(hdme_data_inline_keys[k], name) == 0)\n");
        out.push_str("        {\n");
        out.push_str("            strcpy(str, (const char*) hdme_data_inline_values[k]);\n");
        out.push_str("            return 1;\n");
        out.push_str("        }\n");
        out.push_str("    }\n");
        out.push_str("    return 0;\n");
        out.push_str("}\n");
        out
    }
}

/// Derive the '/'-separated key from a relative path
fn key_for_path(rel: &Path) -> Result<String, EmbedError> {
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(name) => match name.to_str() {
                Some(text) => parts.push(text),
                None => return Err(EmbedError::InvalidKey(rel.display().to_string())),
            },
            _ => return Err(EmbedError::InvalidKey(rel.display().to_string())),
        }
    }
    if parts.is_empty() {
        return Err(EmbedError::InvalidKey(rel.display().to_string()));
    }
    Ok(parts.join("/"))
}

/// Derive a C identifier from a key by substituting every non-identifier
/// character with '_'; the fixed prefix guarantees a valid leading character
pub fn identifier_for_key(key: &str) -> String {
    let mut identifier = String::with_capacity(IDENT_PREFIX.len() + key.len());
    identifier.push_str(IDENT_PREFIX);
    for ch in key.chars() {
        if ch.is_ascii_alphanumeric() {
            identifier.push(ch);
        } else {
            identifier.push('_');
        }
    }
    identifier
}

/// Best-effort audit comment reproducing the original text; the byte array
/// below it stays authoritative for non-UTF-8 or comment-unsafe content
fn render_audit_comment(out: &mut String, entry: &EmbeddedResource) {
    let text = String::from_utf8_lossy(&entry.bytes);
    let safe = text.replace("*/", "* /");
    let _ = writeln!(out, "/* {}", entry.key);
    for line in safe.lines() {
        let _ = writeln!(out, " * {}", line);
    }
    out.push_str(" */\n");
}

fn render_byte_array(out: &mut String, entry: &EmbeddedResource) {
    let _ = writeln!(out, "static const unsigned char {}[] = {{", entry.identifier);
    // Trailing zero keeps text payloads usable as C strings
    let terminated = entry.bytes.iter().copied().chain(std::iter::once(0u8));
    let mut column = 0;
    out.push_str("    ");
    for byte in terminated {
        if column == BYTES_PER_LINE {
            out.push_str("\n    ");
            column = 0;
        }
        let _ = write!(out, "0x{:02x}, ", byte);
        column += 1;
    }
    out.push('\n');
    out.push_str("};\n");
}

fn c_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
