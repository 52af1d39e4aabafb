use std::collections::HashSet;

use clap::Args;

use ariadne_core::store::CanvasStore;
use ariadne_core::stream::is_error_response;
use ariadne_core::types::{Node, NodeId};

use super::{Context, Workspace, resolve_node, short_id};

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Mark the path from this node back to its root
    #[arg(long)]
    pub path: Option<String>,
}

pub fn run(args: TreeArgs, ctx: &Context) -> anyhow::Result<()> {
    let workspace = Workspace::open(&ctx.dir)?;
    let store = workspace.open_store()?;

    if store.is_empty() {
        println!("(empty canvas)");
        return Ok(());
    }

    let highlighted: HashSet<NodeId> = match args.path.as_deref() {
        Some(query) => {
            let id = resolve_node(&store, query)?;
            store.trace_path(&id).into_iter().collect()
        }
        None => HashSet::new(),
    };

    let mut lines = Vec::new();
    for root in store.roots() {
        render(&store, &root, 0, &highlighted, &mut lines);
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn render(
    store: &CanvasStore,
    node: &Node,
    depth: usize,
    highlighted: &HashSet<NodeId>,
    lines: &mut Vec<String>,
) {
    let mark = if highlighted.contains(&node.id) { '*' } else { ' ' };
    let indent = "  ".repeat(depth);
    let branch = if depth == 0 { "" } else { "└─ " };
    let anchor = node
        .source_anchor
        .as_ref()
        .map(|a| format!(" [from \"{}\"]", a.text))
        .unwrap_or_default();
    lines.push(format!(
        "{mark} {} {indent}{branch}{}{anchor}  ({})",
        short_id(&node.id),
        node.content.user_prompt,
        answer_state(node)
    ));
    for child in store.children(&node.id) {
        render(store, &child, depth + 1, highlighted, lines);
    }
}

/// One-word summary of where a node's answer stands.
pub fn answer_state(node: &Node) -> String {
    let answer = &node.content.ai_response;
    if answer.is_empty() {
        "no answer".to_string()
    } else if is_error_response(answer) {
        "error".to_string()
    } else {
        format!("{} chars", answer.chars().count())
    }
}
