//! `hdme-build undo` — Restore the loader and remove generated artifacts.

use crate::output::StyledOutput;
use hdme_embed::Patcher;
use std::path::Path;

pub fn execute(root: &Path, manifest: Option<&Path>, out: &mut StyledOutput) -> anyhow::Result<()> {
    let config = super::load_config(root, manifest)?;
    let patcher = Patcher::new(&config, root);

    if patcher.undo()? {
        out.success(&format!(
            "Restored {}\n",
            patcher.loader_path().display()
        ));
    } else {
        out.info("Nothing to undo; source tree already clean\n");
    }
    out.flush();
    Ok(())
}
