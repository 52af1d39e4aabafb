use clap::Args;

use super::{Context, Workspace, resolve_node, stream_answer};

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question
    pub prompt: String,

    /// Attach the question under an existing node (id or unique prefix)
    #[arg(long)]
    pub parent: Option<String>,

    /// Text from the parent's answer the question branches from
    #[arg(long, requires = "parent")]
    pub anchor: Option<String>,
}

pub async fn run(args: AskArgs, ctx: &Context) -> anyhow::Result<()> {
    let workspace = Workspace::open(&ctx.dir)?;
    let store = workspace.open_store()?;
    let parent = args
        .parent
        .as_deref()
        .map(|p| resolve_node(&store, p))
        .transpose()?;

    let orchestrator = workspace.orchestrator(store.clone())?;
    let created = orchestrator.create_node(&args.prompt, parent.as_ref(), args.anchor.as_deref())?;
    if !ctx.quiet {
        eprintln!("[{}] {}", super::short_id(&created.id), args.prompt.trim());
    }
    stream_answer(&store, created, ctx).await
}
