//! Command implementations and the helpers they share.

pub mod config;
pub mod construct;
pub mod ladder;
pub mod vote;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use concord_core::data::{TradeRecord, read_ledger_file};
use concord_core::traits::InMemoryLedger;
use concord_core::types::{AgentId, Regime, RegimeAffinity, StrategyId, Timestamp};
use concord_engine::{ConcordConfig, CycleInput, CycleReport, CycleRunner};
use serde::de::DeserializeOwned;
use tracing::info;

/// Ledger and cycle inputs shared by every cycle-running command.
#[derive(Args, Debug, Clone)]
pub struct CycleArgs {
    /// Trade ledger as a JSON array of records
    #[arg(short, long)]
    pub ledger: PathBuf,

    /// Current regime (trend, range, shock)
    #[arg(short, long, default_value = "trend")]
    pub regime: Regime,

    /// Regime affinities as a JSON object keyed by strategy id
    #[arg(long)]
    pub affinities: Option<PathBuf>,

    /// Drift-free days as a JSON object keyed by agent id
    #[arg(long)]
    pub drift: Option<PathBuf>,

    /// Cycle time (RFC 3339 or epoch millis); defaults to the newest trade
    #[arg(long)]
    pub as_of: Option<String>,
}

/// Output format for command results.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Plain-text table
    Table,
}

/// Reads and deserializes a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {what} file {}", path.display()))
}

/// Loads the ledger file and rejects records with non-positive prices.
pub fn load_trades(path: &Path) -> Result<Vec<TradeRecord>> {
    let trades = read_ledger_file(path)
        .with_context(|| format!("Failed to load ledger {}", path.display()))?;
    info!(path = %path.display(), trades = trades.len(), "Loaded ledger");
    Ok(trades)
}

/// Resolves the cycle time: explicit value, else the newest trade, else the
/// epoch.
pub fn resolve_as_of(explicit: Option<&str>, trades: &[TradeRecord]) -> Result<Timestamp> {
    match explicit {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid --as-of value: {raw}")),
        None => Ok(trades
            .iter()
            .map(|t| t.created_at)
            .max()
            .unwrap_or(Timestamp::ZERO)),
    }
}

/// Runs one cycle over the ledger file.
pub async fn run_cycle(
    config: &ConcordConfig,
    args: &CycleArgs,
) -> Result<(CycleRunner, CycleReport)> {
    let trades = load_trades(&args.ledger)?;
    let as_of = resolve_as_of(args.as_of.as_deref(), &trades)?;

    let mut input = CycleInput::new(args.regime, as_of);
    if let Some(path) = &args.affinities {
        input.affinities = read_json::<BTreeMap<StrategyId, RegimeAffinity>>(path, "affinities")?;
    }
    if let Some(path) = &args.drift {
        input.drift_free_days = read_json::<BTreeMap<AgentId, u32>>(path, "drift")?;
    }

    let runner = CycleRunner::new(config.clone(), Arc::new(InMemoryLedger::new(trades)));
    let report = runner
        .run_cycle(input)
        .await
        .context("Construction cycle failed")?;
    Ok((runner, report))
}

/// Writes `output` to `file`, or stdout when none is given.
pub fn emit(output: &str, file: Option<&Path>) -> Result<()> {
    if let Some(path) = file {
        std::fs::write(path, output)
            .with_context(|| format!("Failed to write output file {}", path.display()))?;
        info!(path = %path.display(), "Results written");
    } else {
        println!("{output}");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use concord_core::types::{Direction, Instrument, TradeEnvironment};
    use rust_decimal::Decimal;
    use std::io::Write;

    pub(crate) fn sample_trades() -> Vec<TradeRecord> {
        let mut trades = Vec::new();
        for n in 0..24_i64 {
            let alpha = if n % 3 == 0 { -2 } else { 4 };
            let beta = if n % 2 == 0 { 3 } else { -1 };
            for (agent, bps) in [("alpha", alpha), ("beta", beta)] {
                trades.push(TradeRecord {
                    trade_id: format!("{agent}-{n}"),
                    agent_id: AgentId::from(agent),
                    instrument: Instrument::new("EUR_USD").unwrap(),
                    direction: Direction::Long,
                    entry_price: Decimal::new(1_000_000, 4),
                    exit_price: Decimal::new(1_000_000 + bps * 100, 4),
                    session_label: "london".to_string(),
                    regime_label: Regime::Range,
                    environment: TradeEnvironment::Practice,
                    created_at: Timestamp::new_unchecked(1_700_000_000_000 + n * 3_600_000),
                });
            }
        }
        trades
    }

    pub(crate) fn ledger_file(trades: &[TradeRecord]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(trades).unwrap().as_bytes())
            .unwrap();
        file
    }

    pub(crate) fn cycle_args(ledger: &Path) -> CycleArgs {
        CycleArgs {
            ledger: ledger.to_path_buf(),
            regime: Regime::Trend,
            affinities: None,
            drift: None,
            as_of: None,
        }
    }

    #[test]
    fn test_load_trades_reads_camel_case_ledger() {
        let file = ledger_file(&sample_trades());
        let trades = load_trades(file.path()).unwrap();
        assert_eq!(trades.len(), 48);

        let raw = std::fs::read_to_string(file.path()).unwrap();
        assert!(raw.contains("\"agentId\""));
        assert!(raw.contains("\"pair\""));
    }

    #[test]
    fn test_load_trades_rejects_bad_price() {
        let mut trades = sample_trades();
        trades[0].entry_price = Decimal::ZERO;
        let file = ledger_file(&trades);
        let err = load_trades(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("[Validation]"));
    }

    #[test]
    fn test_resolve_as_of() {
        let trades = sample_trades();
        assert_eq!(
            resolve_as_of(None, &trades).unwrap(),
            Timestamp::new_unchecked(1_700_000_000_000 + 23 * 3_600_000)
        );
        assert_eq!(resolve_as_of(None, &[]).unwrap(), Timestamp::ZERO);
        assert_eq!(
            resolve_as_of(Some("1000"), &trades).unwrap(),
            Timestamp::new_unchecked(1000)
        );
        assert!(resolve_as_of(Some("yesterday"), &trades).is_err());
    }

    #[tokio::test]
    async fn test_run_cycle_with_affinities() {
        let file = ledger_file(&sample_trades());
        let mut affinities = tempfile::NamedTempFile::new().unwrap();
        write!(affinities, r#"{{"alpha": {{"trend": 2.0, "range": 0.5, "shock": 0.0}}}}"#).unwrap();

        let mut args = cycle_args(file.path());
        args.affinities = Some(affinities.path().to_path_buf());
        let (_runner, report) = run_cycle(&ConcordConfig::default(), &args).await.unwrap();

        assert_eq!(report.trades_fetched, 48);
        assert_eq!(report.portfolio.result.members.len(), 2);
    }
}
