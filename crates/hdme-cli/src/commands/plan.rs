//! `hdme-build plan` — Show the source/resource partition of the library tree.

use crate::output::StyledOutput;
use hdme_embed::Collector;
use std::path::Path;

pub fn execute(root: &Path, manifest: Option<&Path>, out: &mut StyledOutput) -> anyhow::Result<()> {
    let config = super::load_config(root, manifest)?;
    let tree = Collector::new(&config, root).collect()?;

    out.bold("Compilable sources:\n");
    for path in &tree.sources {
        out.plain(&format!("  {}\n", config.lib_dir.join(path).display()));
    }
    out.newline();

    out.bold("Data resources:\n");
    for path in &tree.resources {
        out.dim(&format!("  {}\n", path.display()));
    }
    out.newline();

    out.info(&format!(
        "{} sources, {} resources\n",
        tree.sources.len(),
        tree.resources.len()
    ));
    out.flush();
    Ok(())
}
