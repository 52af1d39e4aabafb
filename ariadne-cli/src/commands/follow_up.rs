use clap::Args;

use ariadne_core::anchor::{AnchorTracker, TextRange};

use super::{Context, Workspace, resolve_node, stream_answer};

#[derive(Args, Debug)]
pub struct FollowUpArgs {
    /// Node whose answer contains the selected text (id or unique prefix)
    pub node: String,

    /// The selected text from that answer
    #[arg(long)]
    pub anchor: String,

    /// The new question
    pub question: String,
}

pub async fn run(args: FollowUpArgs, ctx: &Context) -> anyhow::Result<()> {
    let workspace = Workspace::open(&ctx.dir)?;
    let store = workspace.open_store()?;
    let node_id = resolve_node(&store, &args.node)?;
    let Some(node) = store.node(&node_id) else {
        anyhow::bail!("Node not found: {node_id}");
    };

    let selection = args.anchor.trim();
    let Some(range) = TextRange::locate(&node.content.ai_response, selection) else {
        anyhow::bail!(
            "Selected text not found in the answer of {}: \"{selection}\"",
            super::short_id(&node_id)
        );
    };
    AnchorTracker::new(store.clone()).capture(&node_id, selection, range, None)?;

    let orchestrator = workspace.orchestrator(store.clone())?;
    let created = orchestrator.follow_up(&args.question)?;
    if !ctx.quiet {
        eprintln!(
            "[{}] {} (from \"{selection}\")",
            super::short_id(&created.id),
            args.question.trim()
        );
    }
    stream_answer(&store, created, ctx).await
}
