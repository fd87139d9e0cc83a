//! `hdme-build apply` — Patch the runtime loader to use the embedded table.

use crate::output::StyledOutput;
use hdme_embed::{Collector, EmbeddedTable, Patcher};
use std::path::Path;

pub fn execute(root: &Path, manifest: Option<&Path>, out: &mut StyledOutput) -> anyhow::Result<()> {
    let config = super::load_config(root, manifest)?;
    let tree = Collector::new(&config, root).collect()?;
    let table = EmbeddedTable::from_files(&config.data_path(root), &tree.resources)?;

    let patcher = Patcher::new(&config, root);
    let reapplied = patcher.is_applied();
    patcher.apply(&table)?;

    if reapplied {
        out.warning("Patch already applied; regenerated the patched unit\n");
    }
    out.success(&format!(
        "Embedded {} resources; patched unit at {}\n",
        table.len(),
        patcher.generated_path().display()
    ));
    out.dim(&format!(
        "Original loader preserved at {}\n",
        patcher.backup_path().display()
    ));
    out.flush();
    Ok(())
}
