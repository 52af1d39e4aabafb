use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;

use ariadne_core::config::{AriadneConfig, Theme};

use super::{ARIADNE_DIR, CONFIG_FILE, Context};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Model name to write into the config
    #[arg(long)]
    pub model: Option<String>,

    /// Initial theme for HTML exports: light or dark
    #[arg(long, value_parser = parse_theme)]
    pub theme: Option<Theme>,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

fn parse_theme(value: &str) -> Result<Theme, String> {
    match value.to_ascii_lowercase().as_str() {
        "light" => Ok(Theme::Light),
        "dark" => Ok(Theme::Dark),
        other => Err(format!("unknown theme `{other}` (expected light or dark)")),
    }
}

pub fn run(args: InitArgs, ctx: &Context) -> anyhow::Result<()> {
    std::fs::create_dir_all(&ctx.dir)
        .with_context(|| format!("Cannot create directory: {}", ctx.dir.display()))?;
    let root = std::fs::canonicalize(&ctx.dir)
        .with_context(|| format!("Cannot resolve path: {}", ctx.dir.display()))?;
    let ariadne_dir: PathBuf = root.join(ARIADNE_DIR);
    let config_path = ariadne_dir.join(CONFIG_FILE);

    if config_path.exists() && !args.force {
        anyhow::bail!(
            "Ariadne is already set up in {} (use --force to rewrite the config)",
            root.display()
        );
    }

    let mut config = AriadneConfig::default();
    if let Some(model) = args.model {
        config.model.name = model;
    }
    if let Some(theme) = args.theme {
        config.ui.theme = theme;
    }
    config.validate().context("Invalid config")?;

    std::fs::create_dir_all(&ariadne_dir)
        .with_context(|| format!("Cannot create {}", ariadne_dir.display()))?;
    let text = config.to_toml().context("Cannot serialize config")?;
    std::fs::write(&config_path, text)
        .with_context(|| format!("Cannot write config: {}", config_path.display()))?;

    if !ctx.quiet {
        println!("Initialized Ariadne in {}", ariadne_dir.display());
        println!("  model: {}", config.model.name);
        println!("  API key is read from ${}", config.model.api_key_env);
    }
    Ok(())
}
