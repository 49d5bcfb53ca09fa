//! Dropclaim CLI
//!
//! Terminal interface for browsing airdrop campaigns and claiming allocations.

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{FileConfig, Settings};

#[derive(Parser)]
#[command(name = "dropclaim")]
#[command(author = "LogicCrafter")]
#[command(version = "0.1.0")]
#[command(about = "Dropclaim - browse airdrop campaigns and claim allocations", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (default: <config dir>/dropclaim/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Chain snapshot to read from (overrides the config file)
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Retry budget for transient failures (overrides the config file)
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List airdrop campaigns
    Campaigns(commands::campaigns::CampaignsArgs),

    /// Show a single campaign
    Campaign(commands::campaign::CampaignArgs),

    /// Show a user's allocation in one campaign
    Allocation(commands::allocation::AllocationArgs),

    /// Show a user's allocations across several campaigns
    Allocations(commands::allocations::AllocationsArgs),

    /// Claim a user's allocation
    Claim(commands::claim::ClaimArgs),
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let file = match FileConfig::load(cli.config.as_deref()) {
        Ok(file) => file,
        Err(e) => {
            output::error(&format!("{:#}", e));
            std::process::exit(2);
        }
    };
    let settings = Settings::resolve(file, cli.snapshot, cli.max_retries);

    let exit_code = match cli.command {
        Commands::Campaigns(args) => commands::campaigns::run(args, &settings).await,
        Commands::Campaign(args) => commands::campaign::run(args, &settings).await,
        Commands::Allocation(args) => commands::allocation::run(args, &settings).await,
        Commands::Allocations(args) => commands::allocations::run(args, &settings).await,
        Commands::Claim(args) => commands::claim::run(args, &settings).await,
    };

    std::process::exit(exit_code);
}
