use clap::Args;

use ariadne_core::stream::is_error_response;

use super::{Context, Workspace};

#[derive(Args, Debug)]
pub struct StatusArgs {}

pub fn run(_args: StatusArgs, ctx: &Context) -> anyhow::Result<()> {
    let workspace = Workspace::open(&ctx.dir)?;
    let store = workspace.open_store()?;
    let config = &workspace.config;

    let nodes = store.nodes();
    let unanswered = nodes.iter().filter(|n| n.content.ai_response.is_empty()).count();
    let failed = nodes
        .iter()
        .filter(|n| is_error_response(&n.content.ai_response))
        .count();
    let key_set = std::env::var(&config.model.api_key_env).is_ok_and(|k| !k.trim().is_empty());

    println!("Ariadne status for {}", workspace.root.display());
    println!();
    println!("  Canvas:   {}", workspace.canvas_path().display());
    println!("  Model:    {} ({})", config.model.name, config.model.provider);
    println!(
        "  API key:  ${} {}",
        config.model.api_key_env,
        if key_set { "set" } else { "not set" }
    );
    println!("  Theme:    {}", config.ui.theme.as_str());
    println!();
    println!("  Nodes: {} total", nodes.len());
    println!("    {:<12} {:>6}", "roots", store.roots().len());
    println!("    {:<12} {:>6}", "unanswered", unanswered);
    println!("    {:<12} {:>6}", "errors", failed);
    println!("  Edges: {} total", store.edge_count());
    Ok(())
}
