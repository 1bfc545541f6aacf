use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use rss_notice::{App, Config, Result};

#[derive(Debug, Parser)]
#[command(name = "rss-notice", version, about = "Report new feed articles once per tag")]
struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch new articles for one tag and mark them as reported
    Check {
        tag: String,
        /// Report without marking articles as seen
        #[arg(long)]
        dry_run: bool,
    },
    /// Check every configured tag
    CheckAll {
        #[arg(long)]
        dry_run: bool,
    },
    /// Forget reported articles so they are reported again
    Clear {
        #[arg(long)]
        tag: Option<String>,
        /// Only forget articles recorded within the last N days
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
    },
    /// List configured feed sources
    Sources,
    /// Show articles already reported for a tag
    Seen { tag: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app = App::new(config).await?;

    match cli.command {
        Command::Check { tag, dry_run } => print_json(&app.check(&tag, dry_run).await?),
        Command::CheckAll { dry_run } => print_json(&app.check_all(dry_run).await),
        Command::Clear { tag, days } => print_json(&app.clear(tag.as_deref(), days).await?),
        Command::Sources => print_json(&app.sources()),
        Command::Seen { tag } => print_json(&app.seen(&tag).await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
