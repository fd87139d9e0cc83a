//! `hdme-build package` — Run the full pipeline with guaranteed cleanup.
//!
//! Collects the tree, embeds the data files, applies the loader patch, writes
//! the extension descriptor and (optionally) invokes the external build
//! driver. The patch is always undone afterwards, on failure paths included,
//! so repeated invocations never see a half-patched tree.

use crate::output::StyledOutput;
use anyhow::{bail, Context};
use hdme_embed::{Collector, EmbeddedTable, ExtensionDescriptor, Patcher};
use std::path::{Path, PathBuf};
use std::process::Command;

pub fn execute(
    root: &Path,
    manifest: Option<&Path>,
    target: Option<&Path>,
    driver: &[String],
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let config = super::load_config(root, manifest)?;
    let tree = Collector::new(&config, root).collect()?;
    let table = EmbeddedTable::from_files(&config.data_path(root), &tree.resources)?;

    let descriptor_path: PathBuf = match target {
        Some(path) => super::resolve_under_root(root, path),
        None => root.join("extension.json"),
    };

    let patcher = Patcher::new(&config, root);
    let guard = patcher.apply_scoped(&table)?;
    out.info(&format!(
        "Embedded {} resources; building extension '{}'\n",
        table.len(),
        config.extension_name
    ));
    out.flush();

    let built = (|| -> anyhow::Result<()> {
        let descriptor = ExtensionDescriptor::assemble(&config, &tree);
        descriptor
            .write_json(&descriptor_path)
            .with_context(|| format!("Failed to write {}", descriptor_path.display()))?;

        if !driver.is_empty() {
            run_driver(root, driver, &descriptor_path)?;
        }
        Ok(())
    })();

    // Guaranteed release: restore the tree whether the driver succeeded or not
    let cleaned = guard.undo();
    built?;
    cleaned.context("Failed to restore the source tree after packaging")?;

    out.success(&format!(
        "Extension descriptor written to {}\n",
        descriptor_path.display()
    ));
    out.flush();
    Ok(())
}

/// Invoke the external build driver with the descriptor path appended
fn run_driver(root: &Path, driver: &[String], descriptor: &Path) -> anyhow::Result<()> {
    let status = Command::new(&driver[0])
        .args(&driver[1..])
        .arg(descriptor)
        .current_dir(root)
        .status()
        .with_context(|| format!("Failed to launch build driver {:?}", driver[0]))?;
    if !status.success() {
        bail!("Build driver exited with {}", status);
    }
    Ok(())
}
