//! hdme extension build tool
//!
//! Single command-line interface over the extension build pipeline:
//! source collection, compile-time data embedding, runtime-loader patching
//! and build-target emission.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

use output::{resolve_color_choice, StyledOutput};

#[derive(Parser)]
#[command(name = "hdme-build")]
#[command(about = "Build pipeline for the hdme loadable extension", long_about = None)]
#[command(version)]
struct Cli {
    /// Project root containing the library tree
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Build manifest (default: hdme-build.toml under the root, optional)
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    /// Color output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the source/resource partition of the library tree
    Plan,

    /// Render the generated lookup source
    Embed {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Patch the runtime loader to answer from the embedded table
    Apply,

    /// Restore the original loader and remove generated artifacts
    Undo,

    /// Run the full pipeline: embed, patch, emit descriptor, clean up
    Package {
        /// Descriptor output path (default: extension.json under the root)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// External build driver command; invoked with the descriptor path
        /// appended while the patch is applied
        #[arg(long, num_args = 1.., value_name = "CMD")]
        driver: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut out = StyledOutput::new(resolve_color_choice(cli.color.as_deref()));
    let root = cli.root.as_path();
    let manifest = cli.manifest.as_deref();

    match cli.command {
        Commands::Plan => commands::plan::execute(root, manifest, &mut out)?,
        Commands::Embed { out: target } => {
            commands::embed::execute(root, manifest, target.as_deref(), &mut out)?
        }
        Commands::Apply => commands::apply::execute(root, manifest, &mut out)?,
        Commands::Undo => commands::undo::execute(root, manifest, &mut out)?,
        Commands::Package { out: target, driver } => {
            commands::package::execute(root, manifest, target.as_deref(), &driver, &mut out)?
        }
    }

    Ok(())
}
