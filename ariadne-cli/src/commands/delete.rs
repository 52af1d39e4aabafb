use clap::Args;

use super::{Context, Workspace, resolve_node, short_id};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Node id or unique prefix
    pub node: String,
}

pub fn run(args: DeleteArgs, ctx: &Context) -> anyhow::Result<()> {
    let workspace = Workspace::open(&ctx.dir)?;
    let store = workspace.open_store()?;
    let id = resolve_node(&store, &args.node)?;
    let removed = store.delete_node(&id);
    if !ctx.quiet {
        println!(
            "Deleted {} ({} node{} removed)",
            short_id(&id),
            removed.len(),
            if removed.len() == 1 { "" } else { "s" }
        );
    }
    Ok(())
}
