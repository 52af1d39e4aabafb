pub mod ask;
pub mod delete;
pub mod export;
pub mod follow_up;
pub mod import;
pub mod init;
pub mod move_node;
pub mod reset;
pub mod show;
pub mod status;
pub mod tree;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::Subcommand;
use tokio::sync::broadcast::error::RecvError;

use ariadne_core::config::AriadneConfig;
use ariadne_core::llm::create_backend;
use ariadne_core::orchestrator::{CreatedNode, Orchestrator};
use ariadne_core::store::{CanvasStore, JsonFilePersistence, StoreEvent};
use ariadne_core::stream::{StreamOutcome, StreamingPipeline};
use ariadne_core::types::NodeId;

pub const ARIADNE_DIR: &str = ".ariadne";
pub const CONFIG_FILE: &str = "config.toml";

/// Flags shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    pub dir: PathBuf,
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create `.ariadne/` with a default config in the workspace directory
    Init(init::InitArgs),
    /// Ask a new question and stream the answer
    Ask(ask::AskArgs),
    /// Branch a follow-up question from text in an existing answer
    FollowUp(follow_up::FollowUpArgs),
    /// Print the canvas as a tree of questions
    Tree(tree::TreeArgs),
    /// Show one node in full
    Show(show::ShowArgs),
    /// Move a node on the canvas
    Move(move_node::MoveArgs),
    /// Delete a node and everything branched from it
    Delete(delete::DeleteArgs),
    /// Remove every node and edge
    Reset(reset::ResetArgs),
    /// Write the canvas as HTML, Markdown, and/or a project file
    Export(export::ExportArgs),
    /// Replace the canvas with a project file
    Import(import::ImportArgs),
    /// Summarize the workspace and canvas
    Status(status::StatusArgs),
}

pub async fn run(cmd: Command, ctx: Context) -> anyhow::Result<()> {
    match cmd {
        Command::Init(args) => init::run(args, &ctx),
        Command::Ask(args) => ask::run(args, &ctx).await,
        Command::FollowUp(args) => follow_up::run(args, &ctx).await,
        Command::Tree(args) => tree::run(args, &ctx),
        Command::Show(args) => show::run(args, &ctx),
        Command::Move(args) => move_node::run(args, &ctx),
        Command::Delete(args) => delete::run(args, &ctx),
        Command::Reset(args) => reset::run(args, &ctx),
        Command::Export(args) => export::run(args, &ctx),
        Command::Import(args) => import::run(args, &ctx),
        Command::Status(args) => status::run(args, &ctx),
    }
}

/// An initialized workspace: its root, `.ariadne/` directory, and config.
#[derive(Debug)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: AriadneConfig,
}

impl Workspace {
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        let root = std::fs::canonicalize(dir)
            .with_context(|| format!("Cannot resolve path: {}", dir.display()))?;

        let ariadne_dir = root.join(ARIADNE_DIR);
        if !ariadne_dir.exists() {
            anyhow::bail!(
                "Ariadne is not initialized in {}. Run `ariadne init` first.",
                root.display()
            );
        }

        let config_path = ariadne_dir.join(CONFIG_FILE);
        let config = AriadneConfig::load(&config_path)
            .with_context(|| format!("Cannot load config: {}", config_path.display()))?;

        Ok(Self { root, config })
    }

    pub fn ariadne_dir(&self) -> PathBuf {
        self.root.join(ARIADNE_DIR)
    }

    pub fn canvas_path(&self) -> PathBuf {
        self.ariadne_dir().join(&self.config.storage.canvas_file)
    }

    pub fn open_store(&self) -> anyhow::Result<Arc<CanvasStore>> {
        let path = self.canvas_path();
        let store = CanvasStore::open(Box::new(JsonFilePersistence::new(&path)))
            .with_context(|| format!("Cannot open canvas storage: {}", path.display()))?;
        Ok(Arc::new(store))
    }

    /// Orchestrator wired to the configured endpoint. Needs the API key
    /// from the environment.
    pub fn orchestrator(&self, store: Arc<CanvasStore>) -> anyhow::Result<Orchestrator> {
        let model = &self.config.model;
        let api_key = std::env::var(&model.api_key_env).unwrap_or_default();
        let backend = create_backend(model, &api_key).context("Cannot create LLM backend")?;
        let pipeline =
            StreamingPipeline::new(Arc::from(backend), store).with_temperature(model.temperature);
        Ok(Orchestrator::new(pipeline).with_prompt(self.config.prompt.clone()))
    }
}

/// Resolve a full node id or a unique prefix of one.
pub fn resolve_node(store: &CanvasStore, query: &str) -> anyhow::Result<NodeId> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("Node id must not be empty");
    }
    let exact = NodeId::from(query);
    if store.contains(&exact) {
        return Ok(exact);
    }
    let matches: Vec<NodeId> = store
        .nodes()
        .into_iter()
        .map(|n| n.id)
        .filter(|id| id.as_str().starts_with(query))
        .collect();
    match matches.as_slice() {
        [one] => Ok(one.clone()),
        [] => anyhow::bail!("Node not found: {query}"),
        many => anyhow::bail!(
            "Node id prefix `{query}` is ambiguous ({} matches); use more characters",
            many.len()
        ),
    }
}

/// First eight characters of an id, for listings.
pub fn short_id(id: &NodeId) -> &str {
    let s = id.as_str();
    s.char_indices().nth(8).map_or(s, |(i, _)| &s[..i])
}

/// Print a node's answer to stdout as it streams in, until the stream ends.
/// Ctrl-C cancels the stream; the partial answer stays on the canvas.
pub async fn stream_answer(
    store: &CanvasStore,
    created: CreatedNode,
    ctx: &Context,
) -> anyhow::Result<()> {
    let CreatedNode { id, stream } = created;
    let mut events = store.subscribe();
    let mut printer = AnswerPrinter::default();
    let cancel = stream.token();
    let join = stream.join();
    tokio::pin!(join);

    let outcome = loop {
        tokio::select! {
            outcome = &mut join => break outcome,
            event = events.recv() => match event {
                Ok(StoreEvent::ContentUpdated(updated)) if updated == id => {
                    printer.show(store, &id)?;
                }
                // Missed events are fine: every update carries the full answer.
                Ok(_) | Err(RecvError::Lagged(_) | RecvError::Closed) => {}
            },
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
            }
        }
    };
    printer.show(store, &id)?;
    println!();

    match outcome {
        StreamOutcome::Completed { chunks, malformed, .. } => {
            if !ctx.quiet {
                let node = store.node(&id);
                let model = node
                    .as_ref()
                    .and_then(|n| n.content.model.clone())
                    .unwrap_or_default();
                let tokens = node
                    .and_then(|n| n.content.tokens_used)
                    .map(|t| format!(", {t} tokens"))
                    .unwrap_or_default();
                eprintln!("[{}] {model}{tokens}, {chunks} chunks", short_id(&id));
                if malformed > 0 {
                    eprintln!("  ({malformed} unreadable lines skipped)");
                }
            }
            Ok(())
        }
        StreamOutcome::Cancelled => {
            if !ctx.quiet {
                eprintln!("[{}] cancelled; partial answer kept", short_id(&id));
            }
            Ok(())
        }
        StreamOutcome::Failed { message } => anyhow::bail!("LLM API error: {message}"),
    }
}

/// Prints only the part of an answer not yet shown.
#[derive(Debug, Default)]
struct AnswerPrinter {
    shown: String,
}

impl AnswerPrinter {
    fn show(&mut self, store: &CanvasStore, id: &NodeId) -> anyhow::Result<()> {
        let Some(node) = store.node(id) else {
            return Ok(());
        };
        let text = node.content.ai_response;
        let mut out = std::io::stdout().lock();
        if let Some(rest) = text.strip_prefix(self.shown.as_str()) {
            out.write_all(rest.as_bytes())?;
        } else {
            // The answer was replaced (error text), not extended.
            out.write_all(b"\n")?;
            out.write_all(text.as_bytes())?;
        }
        out.flush()?;
        self.shown = text;
        Ok(())
    }
}
