use clap::Args;

use super::{Context, Workspace};

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Confirm removing every node
    #[arg(long)]
    pub yes: bool,
}

pub fn run(args: ResetArgs, ctx: &Context) -> anyhow::Result<()> {
    let workspace = Workspace::open(&ctx.dir)?;
    if !args.yes {
        anyhow::bail!("Reset removes every node; re-run with --yes to confirm");
    }
    let store = workspace.open_store()?;
    let count = store.len();
    store.clear_all();
    if !ctx.quiet {
        println!("Canvas reset ({count} nodes removed)");
    }
    Ok(())
}
