use std::path::PathBuf;

use clap::Parser;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "ariadne",
    version,
    about = "Grow a branching map of questions and streamed answers",
    long_about = "Grow a branching map of questions and streamed answers.\n\n\
                  The canvas lives in `.ariadne/canvas.json` and is rewritten whole on \
                  every change. Run one `ariadne` process per workspace at a time: \
                  concurrent processes do not see each other's writes, and the last \
                  one to save wins."
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Workspace directory holding `.ariadne/` (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Classify an error into a process exit code.
///
/// Exit codes:
///   0: success
///   1: general/unknown error
///   2: configuration error
///   3: workspace not found / not initialized
///   4: canvas storage error
///   6: LLM API error
///   7: export or import failed
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    let msg = format!("{err:#}");
    let lower = msg.to_lowercase();

    if lower.contains("not initialized") || lower.contains("cannot resolve path") {
        3 // workspace not found
    } else if lower.contains("llm") || lower.contains("api_key") || lower.contains("api error") {
        6 // LLM API error
    } else if lower.contains("config") {
        2 // config error
    } else if lower.contains("storage") || lower.contains("canvas file") {
        4 // storage error
    } else if lower.contains("export") || lower.contains("import") {
        7 // export/import failed
    } else {
        1 // general error
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create runtime: {e}");
            std::process::exit(1);
        }
    };

    let ctx = commands::Context {
        dir: cli.dir,
        quiet: cli.quiet,
    };
    match runtime.block_on(commands::run(cli.command, ctx)) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}
