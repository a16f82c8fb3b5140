//! `ladder`: deployment snapshots after one evaluation.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use concord_core::types::AgentId;
use concord_engine::ConcordConfig;
use concord_governance::{DeploymentSnapshot, Transition};
use serde::Serialize;

use super::{CycleArgs, OutputFormat, emit, run_cycle};

/// Arguments for the ladder command
#[derive(Parser, Debug)]
pub struct LadderArgs {
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

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LadderView<'a> {
    deployments: &'a BTreeMap<AgentId, DeploymentSnapshot>,
    transitions: &'a [Transition],
}

/// Prints every agent's deployment snapshot.
///
/// # Errors
///
/// Returns error if the inputs cannot be read or the cycle fails.
pub async fn run(config: &ConcordConfig, args: LadderArgs) -> Result<()> {
    let (_runner, report) = run_cycle(config, &args.cycle).await?;

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&LadderView {
            deployments: &report.deployments,
            transitions: &report.transitions,
        })?,
        OutputFormat::Table => {
            let mut out = String::new();
            writeln!(out, "{:<24} {:<14} {:>6}  {}", "agent", "state", "size", "blocked by")?;
            for snapshot in report.deployments.values() {
                let blocked: Vec<&str> = snapshot
                    .unmet_criteria
                    .iter()
                    .map(|c| c.message.as_str())
                    .collect();
                writeln!(
                    out,
                    "{:<24} {:<14} {:>6.2}  {}",
                    snapshot.agent_id.as_str(),
                    snapshot.state.as_str(),
                    snapshot.size_multiplier,
                    blocked.join("; ")
                )?;
            }
            for t in &report.transitions {
                writeln!(out, "transition: {} -> {} ({})", t.from, t.to, t.reason)?;
            }
            out
        }
    };
    emit(&output, args.output.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{cycle_args, ledger_file, sample_trades};

    #[tokio::test]
    async fn test_new_agents_report_shadow_with_reasons() {
        let ledger = ledger_file(&sample_trades());
        let out = tempfile::NamedTempFile::new().unwrap();
        let args = LadderArgs {
            cycle: cycle_args(ledger.path()),
            format: OutputFormat::Json,
            output: Some(out.path().to_path_buf()),
        };

        run(&ConcordConfig::default(), args).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.path()).unwrap()).unwrap();
        let alpha = &json["deployments"]["alpha"];
        assert_eq!(alpha["state"], "shadow");
        assert_eq!(alpha["sizeMultiplier"], 0.0);
        assert_eq!(alpha["canExecute"], false);
        assert!(!alpha["unmetCriteria"].as_array().unwrap().is_empty());
        assert!(json["transitions"].as_array().unwrap().is_empty());
    }
}
