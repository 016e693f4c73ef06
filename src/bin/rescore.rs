use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;

use bet_ledger::accuracy::{self, Thresholds};
use bet_ledger::artifact;
use bet_ledger::config::{ArtifactArgs, RunConfig, ScoringArgs};
use bet_ledger::error::ArtifactKind;
use bet_ledger::locator;
use bet_ledger::logging;
use bet_ledger::model::PredictionRecord;

/// Re-score the newest ledger snapshot with different probability bands.
/// Reads only; no snapshot is written.
#[derive(Debug, Parser)]
#[command(name = "rescore")]
struct Cli {
    #[command(flatten)]
    artifacts: ArtifactArgs,
    #[command(flatten)]
    scoring: ScoringArgs,
    /// Only score rows on or after this date.
    #[arg(long)]
    since: Option<NaiveDate>,
    /// Extra high/low band pairs to compare, e.g. `--band 0.7:0.3`.
    #[arg(long = "band", value_parser = parse_band)]
    bands: Vec<Thresholds>,
}

fn parse_band(raw: &str) -> Result<Thresholds, String> {
    let (high, low) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected HIGH:LOW, got '{raw}'"))?;
    let high = artifact::parse_decimal(high).ok_or_else(|| format!("bad high bound '{high}'"))?;
    let low = artifact::parse_decimal(low).ok_or_else(|| format!("bad low bound '{low}'"))?;
    Thresholds::new(high, low).map_err(|e| e.to_string())
}

// Undated rows cannot be placed relative to the cutoff and are dropped.
fn retain_since(records: &mut Vec<PredictionRecord>, since: NaiveDate) {
    records.retain(|r| r.date.known().is_some_and(|d| d >= since));
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let cli = Cli::parse();
    let config =
        RunConfig::from_args(cli.artifacts, cli.scoring).context("invalid run configuration")?;

    let found = locator::locate(
        ArtifactKind::Snapshot,
        &config.snapshot_dir,
        &config.snapshot_template,
        config.today,
        config.max_days_back,
    )?;
    let mut batch = artifact::read_predictions(&found.path)
        .with_context(|| format!("read snapshot {}", found.path.display()))?;
    if let Some(since) = cli.since {
        retain_since(&mut batch.records, since);
    }

    println!("Snapshot: {} ({})", found.path.display(), found.date);
    println!("Rows: {}", batch.records.len());

    let mut bands = vec![config.thresholds];
    bands.extend(cli.bands);
    for thresholds in bands {
        let scored = accuracy::score(&batch.records, thresholds);
        println!();
        println!("high > {:.2}, low <= {:.2}", thresholds.high, thresholds.low);
        for line in accuracy::summary_lines(&scored.metrics) {
            println!("  {line}");
        }
    }

    Ok(())
}
