//! # Concord CLI
//!
//! Command-line interface for the Concord engine.
//!
//! Every command reads the trade ledger from a JSON file:
//! - `construct` runs one cycle and prints the portfolio
//! - `vote` prints a collaboration decision log
//! - `ladder` prints deployment snapshots
//! - `config` prints the effective configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use concord_engine::ConcordConfig;
use concord_telemetry::logging::{LogConfig, init_logging};

use commands::{config, construct, ladder, vote};

/// Concord - multi-strategy portfolio construction and agent governance
#[derive(Parser)]
#[command(name = "concord")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (YAML, TOML or JSON); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run one construction cycle and print the portfolio
    Construct(construct::ConstructArgs),

    /// Print a collaboration decision for a set of votes
    Vote(vote::VoteArgs),

    /// Print deployment ladder snapshots
    Ladder(ladder::LadderArgs),

    /// Show or check the effective configuration
    Config(config::ConfigArgs),

    /// Show system information
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings =
        ConcordConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let mut log_config = LogConfig::from_settings(&settings.logging).console_to_stderr();
    if cli.verbose {
        log_config.level = "debug".to_string();
    }
    let _guards = init_logging(&log_config).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Construct(args) => construct::run(&settings, args).await?,
        Commands::Vote(args) => vote::run(&settings, args).await?,
        Commands::Ladder(args) => ladder::run(&settings, args).await?,
        Commands::Config(args) => config::run(&settings, &args)?,
        Commands::Info => print_info(),
    }

    Ok(())
}

fn print_info() {
    println!("Concord");
    println!("=======");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Rust Edition: 2024");
    println!();
    println!("Portfolio pipeline:");
    println!("  - Pearson correlation engine");
    println!("  - Sharpe-ranked decorrelation filter");
    println!("  - Risk-parity weighting");
    println!("  - Regime routing (trend, range, shock)");
    println!("  - Curve synthesis");
    println!();
    println!("Governance:");
    println!("  - Authority adjustment from solo and pair statistics");
    println!("  - Collaboration voting with baseline comparison");
    println!("  - Fallback guardian");
    println!("  - Deployment ladder (shadow, reduced-live, live, disabled)");
}
