use clap::Args;

use ariadne_core::types::Position;

use super::{Context, Workspace, resolve_node, short_id};

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Node id or unique prefix
    pub node: String,

    /// New x coordinate
    #[arg(allow_hyphen_values = true)]
    pub x: f64,

    /// New y coordinate
    #[arg(allow_hyphen_values = true)]
    pub y: f64,
}

pub fn run(args: MoveArgs, ctx: &Context) -> anyhow::Result<()> {
    let workspace = Workspace::open(&ctx.dir)?;
    let store = workspace.open_store()?;
    let id = resolve_node(&store, &args.node)?;
    if !args.x.is_finite() || !args.y.is_finite() {
        anyhow::bail!("Coordinates must be finite numbers");
    }
    store.update_node_position(&id, Position::new(args.x, args.y));
    if !ctx.quiet {
        println!("Moved {} to ({}, {})", short_id(&id), args.x, args.y);
    }
    Ok(())
}
