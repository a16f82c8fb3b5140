//! `vote`: a collaboration decision over the authorities a ledger implies.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use concord_engine::ConcordConfig;
use concord_governance::{AgentVote, OpenGate};
use tracing::info;

use super::{CycleArgs, emit, read_json, run_cycle};

/// Arguments for the vote command
#[derive(Parser, Debug)]
pub struct VoteArgs {
    /// Ledger and cycle inputs
    #[command(flatten)]
    pub cycle: CycleArgs,

    /// Votes as a JSON array of {agentId, direction, confidence}
    #[arg(long)]
    pub votes: PathBuf,

    /// Let every agent vote regardless of deployment state
    #[arg(long)]
    pub ignore_ladder: bool,

    /// Output file path (optional)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Prints the decision log for the given votes.
///
/// # Errors
///
/// Returns error if the inputs cannot be read or the cycle fails.
pub async fn run(config: &ConcordConfig, args: VoteArgs) -> Result<()> {
    let votes: Vec<AgentVote> = read_json(&args.votes, "votes")?;
    let (runner, _report) = run_cycle(config, &args.cycle).await?;

    let log = if args.ignore_ladder {
        runner.decide_with_gate(&votes, &OpenGate)
    } else {
        runner.decide(&votes)
    };
    info!(
        result = %log.final_result,
        changed = log.outcome_changed,
        "Decision computed"
    );
    emit(&serde_json::to_string_pretty(&log)?, args.output.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{cycle_args, ledger_file, sample_trades};
    use std::io::Write;

    fn votes_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"agentId": "alpha", "direction": "long", "confidence": 0.8}},
                {{"agentId": "beta", "direction": "short", "confidence": 0.6}}
            ]"#
        )
        .unwrap();
        file
    }

    async fn decide(ignore_ladder: bool) -> serde_json::Value {
        let ledger = ledger_file(&sample_trades());
        let votes = votes_file();
        let out = tempfile::NamedTempFile::new().unwrap();
        let args = VoteArgs {
            cycle: cycle_args(ledger.path()),
            votes: votes.path().to_path_buf(),
            ignore_ladder,
            output: Some(out.path().to_path_buf()),
        };
        run(&ConcordConfig::default(), args).await.unwrap();
        serde_json::from_str(&std::fs::read_to_string(out.path()).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_shadow_agents_are_excluded() {
        let log = decide(false).await;
        assert_eq!(log["excludedAgents"].as_array().unwrap().len(), 2);
        assert_eq!(log["finalResult"], "abstain");
    }

    #[tokio::test]
    async fn test_ignore_ladder_counts_every_vote() {
        let log = decide(true).await;
        assert_eq!(log["participatingAgents"].as_array().unwrap().len(), 2);
        assert_eq!(log["baselineVotingResult"], "long");
    }
}
