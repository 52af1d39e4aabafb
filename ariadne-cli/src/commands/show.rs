use clap::Args;

use super::{Context, Workspace, resolve_node, short_id};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Node id or unique prefix
    pub node: String,

    /// Print the node as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ShowArgs, ctx: &Context) -> anyhow::Result<()> {
    let workspace = Workspace::open(&ctx.dir)?;
    let store = workspace.open_store()?;
    let id = resolve_node(&store, &args.node)?;
    let Some(node) = store.node(&id) else {
        anyhow::bail!("Node not found: {id}");
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&node)?);
        return Ok(());
    }

    println!("# {}", node.content.user_prompt);
    println!();
    println!("  id:       {}", node.id);
    println!("  position: ({}, {})", node.position.x, node.position.y);
    if let Some(parent) = &node.parent_id {
        println!("  parent:   {}", short_id(parent));
    }
    if let Some(anchor) = &node.source_anchor {
        println!("  from:     \"{}\"", anchor.text);
    }
    if let Some(model) = &node.content.model {
        println!("  model:    {model}");
    }
    if let Some(tokens) = node.content.tokens_used {
        println!("  tokens:   {tokens}");
    }
    let children = store.children(&id);
    if !children.is_empty() {
        println!("  branches:");
        for child in &children {
            let label = child
                .source_anchor
                .as_ref()
                .map_or(child.content.user_prompt.as_str(), |a| a.text.as_str());
            println!("    {} \"{label}\"", short_id(&child.id));
        }
    }
    println!();
    if node.content.ai_response.is_empty() {
        println!("(no answer yet)");
    } else {
        println!("{}", node.content.ai_response);
    }
    Ok(())
}
