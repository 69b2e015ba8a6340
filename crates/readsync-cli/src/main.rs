use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use readsync_core::Config;

mod commands;

#[derive(Parser)]
#[command(name = "readsync", version, about = "Sync a WeRead bookshelf into Notion")]
struct Cli {
    /// Config file (defaults to ~/.config/readsync/config.toml)
    #[arg(long, global = true, env = "READSYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync book pages and their per-book reading days
    Book(commands::book::BookArgs),
    /// Update the heatmap block and the daily reading-time database
    ReadTime(commands::read_time::ReadTimeArgs),
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "readsync_core=info,readsync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!(path = ?cli.config, "loading config");
    let config = Config::resolve(cli.config.as_deref())?;
    match cli.command {
        Commands::Book(args) => commands::book::run(&config, args),
        Commands::ReadTime(args) => commands::read_time::run(&config, args),
    }
}

fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
