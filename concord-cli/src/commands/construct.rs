//! `construct`: one cycle, portfolio out.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use concord_engine::ConcordConfig;
use tracing::info;

use super::{CycleArgs, OutputFormat, emit, run_cycle};

/// Arguments for the construct command
#[derive(Parser, Debug)]
pub struct ConstructArgs {
    /// Ledger and cycle inputs
    #[command(flatten)]
    pub cycle: CycleArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Output file path (optional)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Runs one construction cycle and prints the portfolio result.
///
/// # Errors
///
/// Returns error if the inputs cannot be read or the cycle fails.
pub async fn run(config: &ConcordConfig, args: ConstructArgs) -> Result<()> {
    let (_runner, report) = run_cycle(config, &args.cycle).await?;
    let result = &report.portfolio.result;
    info!(
        regime = %result.regime_label,
        accepted = result.accepted_count,
        rejected = result.rejected_count,
        "Portfolio constructed"
    );

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Table => {
            let mut out = String::new();
            writeln!(out, "Regime: {}", result.regime_label)?;
            writeln!(
                out,
                "Accepted: {}  Rejected: {}",
                result.accepted_count, result.rejected_count
            )?;
            writeln!(out, "{:<24} {:>10} {:>10}  {}", "strategy", "parity", "final", "status")?;
            for member in &result.members {
                let status = member.rejection.as_ref().map_or_else(
                    || "accepted".to_string(),
                    |r| format!("rejected: {} at {:.3}", r.correlated_with, r.coefficient),
                );
                writeln!(
                    out,
                    "{:<24} {:>10.4} {:>10.4}  {}",
                    member.stream.id().as_str(),
                    member.risk_parity_weight,
                    member.final_weight,
                    status
                )?;
            }
            let m = &result.metrics;
            write!(
                out,
                "Total return {:.2}%  Max drawdown {:.2}%  Sharpe {:.3}  Volatility {:.2}%",
                m.total_return, m.max_drawdown, m.sharpe, m.volatility
            )?;
            out
        }
    };
    emit(&output, args.output.as_deref())
}
