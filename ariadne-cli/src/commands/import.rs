use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;

use ariadne_core::export::import_project;

use super::{Context, Workspace};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Project file (.ariadne or .json)
    pub file: PathBuf,
}

pub fn run(args: ImportArgs, ctx: &Context) -> anyhow::Result<()> {
    let workspace = Workspace::open(&ctx.dir)?;
    let store = workspace.open_store()?;
    let summary = import_project(&store, &args.file)
        .with_context(|| format!("Import failed: {}", args.file.display()))?;
    if !ctx.quiet {
        println!(
            "Imported {} nodes and {} edges from {}",
            summary.nodes,
            summary.edges,
            args.file.display()
        );
        if summary.dropped_edges > 0 {
            println!("  dropped {} edges with missing endpoints", summary.dropped_edges);
        }
    }
    Ok(())
}
