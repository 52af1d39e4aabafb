use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, ValueEnum};

use ariadne_core::export::{
    ExportOptions, Exporter, HtmlExporter, MarkdownExporter, ProjectExporter, all_exporters,
    default_base_name,
};

use super::{Context, Workspace};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// HTML viewer, Markdown transcript, and project file
    All,
    Html,
    Markdown,
    Project,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output directory (default: the workspace directory)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Which file(s) to write
    #[arg(long, value_enum, default_value_t = ExportFormat::All)]
    pub format: ExportFormat,

    /// Base file name (default: ariadne-export-YYYY-MM-DD)
    #[arg(long)]
    pub name: Option<String>,

    /// Document title (default: the base file name)
    #[arg(long)]
    pub title: Option<String>,
}

pub fn run(args: ExportArgs, ctx: &Context) -> anyhow::Result<()> {
    let workspace = Workspace::open(&ctx.dir)?;
    let store = workspace.open_store()?;
    let snapshot = store.snapshot();

    let mut options = ExportOptions::now(workspace.config.ui.theme);
    let base_name = args
        .name
        .unwrap_or_else(|| default_base_name(&options.created_at));
    options.title = args.title.unwrap_or_else(|| base_name.clone());
    let out_dir = args.out.unwrap_or_else(|| workspace.root.clone());

    let exporters: Vec<Box<dyn Exporter>> = match args.format {
        ExportFormat::All => all_exporters(),
        ExportFormat::Html => vec![Box::new(HtmlExporter)],
        ExportFormat::Markdown => vec![Box::new(MarkdownExporter)],
        ExportFormat::Project => vec![Box::new(ProjectExporter)],
    };

    for exporter in exporters {
        let path = exporter
            .write(&snapshot, &options, &out_dir, &base_name)
            .with_context(|| format!("Export failed ({})", exporter.name()))?;
        if !ctx.quiet {
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}
