//! `hdme-build embed` — Render the generated lookup source.

use crate::output::StyledOutput;
use anyhow::Context;
use hdme_embed::{Collector, EmbeddedTable};
use std::path::Path;

pub fn execute(
    root: &Path,
    manifest: Option<&Path>,
    target: Option<&Path>,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let config = super::load_config(root, manifest)?;
    let tree = Collector::new(&config, root).collect()?;
    let table = EmbeddedTable::from_files(&config.data_path(root), &tree.resources)?;
    let rendered = table.render_c();

    match target {
        Some(path) => {
            let path = super::resolve_under_root(root, path);
            std::fs::write(&path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            out.success(&format!(
                "Embedded {} resources into {}\n",
                table.len(),
                path.display()
            ));
            out.flush();
        }
        None => {
            out.plain(&rendered);
            out.flush();
        }
    }
    Ok(())
}
