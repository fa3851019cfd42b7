mod crawl;
mod db;

use clap::{Parser, Subcommand, ValueEnum};
use cinegoods_core::Cinema;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cinegoods")]
#[command(about = "Crawls cinema goods events into the events store and sheet")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl one cinema, or all of them in turn.
    Crawl {
        #[arg(value_enum)]
        source: SourceArg,
        /// Discover and filter only; print targets without capturing or writing.
        #[arg(long)]
        dry_run: bool,
    },
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations.
    Migrate,
    /// Check database connectivity.
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    Cgv,
    Lotte,
    Megabox,
    All,
}

impl SourceArg {
    fn cinemas(self) -> Vec<Cinema> {
        match self {
            SourceArg::Cgv => vec![Cinema::Cgv],
            SourceArg::Lotte => vec![Cinema::Lotte],
            SourceArg::Megabox => vec![Cinema::Megabox],
            SourceArg::All => Cinema::ALL.to_vec(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cinegoods_core::load_app_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(env = %config.env, "configuration loaded");

    match cli.command {
        Commands::Crawl { source, dry_run } => {
            crawl::run_crawl(&config, &source.cinemas(), dry_run).await
        }
        Commands::Db { command } => match command {
            DbCommands::Migrate => db::run_migrate(&config).await,
            DbCommands::Ping => db::run_ping(&config).await,
        },
    }
}
