use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod config;
mod error;
mod events;
#[cfg(test)]
mod test_support;
mod ui;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "chatdock")]
#[command(version)]
#[command(about = "Floating terminal chat widget for a remote chat API", long_about = None)]
struct Cli {
    /// Config file [default: ~/.chatdock/config.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:3000
    #[arg(long)]
    base_url: Option<String>,

    /// Open the chat panel on start
    #[arg(long)]
    open: bool,

    /// Log file [default: ~/.chatdock/chatdock.log]
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration
    ShowConfig,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    if cli.open {
        config.ui.open_on_start = true;
    }

    match cli.command {
        Some(Commands::ShowConfig) => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Some(Commands::Init { force }) => init_config(cli.config, force),
        None => {
            init_logging(cli.log_file)?;
            app::run(config).await
        }
    }
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => Config::default_path()?,
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    Config::default().save(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Log to a file; the terminal belongs to the UI
fn init_logging(path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => Config::home_dir()?.join("chatdock.log"),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatdock=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();

    Ok(())
}
