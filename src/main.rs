use anyhow::{Context, Result};
use clap::Parser;

use bet_ledger::accuracy;
use bet_ledger::config::{ArtifactArgs, RunConfig, ScoringArgs};
use bet_ledger::{Pipeline, logging};

/// Merge the latest predictions into the ledger, fill in game results and
/// report prediction accuracy.
#[derive(Debug, Parser)]
#[command(name = "bet_ledger", version)]
struct Cli {
    #[command(flatten)]
    artifacts: ArtifactArgs,
    #[command(flatten)]
    scoring: ScoringArgs,
    /// Print the run summary as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let cli = Cli::parse();
    let config =
        RunConfig::from_args(cli.artifacts, cli.scoring).context("invalid run configuration")?;
    let pipeline = Pipeline::new(config);
    let summary = pipeline.run()?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serialize run summary")?
        );
        return Ok(());
    }

    println!("Today's date: {}", summary.today);
    println!(
        "Predictions: {} ({})",
        summary.prediction_file.display(),
        summary.prediction_date
    );
    match &summary.prior_snapshot {
        Some(path) => println!("Prior ledger: {}", path.display()),
        None => println!("Prior ledger: none (starting fresh)"),
    }
    println!(
        "Outcomes: {} ({})",
        summary.outcome_file.display(),
        summary.outcome_date
    );
    println!(
        "Ledger: {} prior + {} appended ({} duplicates skipped)",
        summary.merge.prior_rows, summary.merge.appended, summary.merge.duplicates_skipped
    );
    if !summary.reconcile.conflicts.is_empty() {
        println!("Conflicting results: {}", summary.reconcile.conflicts.len());
        for c in summary.reconcile.conflicts.iter().take(8) {
            println!(
                " - {} {} vs {}: {:?}",
                c.date, c.home_team, c.away_team, c.candidates
            );
        }
    }
    if !summary.quality.is_clean() {
        println!(
            "Data quality: {} non-numeric probabilities, {} unknown dates, {} unreadable won flags",
            summary.quality.non_numeric_probs,
            summary.quality.unknown_dates,
            summary.quality.unreadable_won
        );
    }
    println!();
    for line in accuracy::summary_lines(&summary.metrics) {
        println!("{line}");
    }
    println!();
    println!("Snapshot: {}", summary.snapshot.display());

    Ok(())
}
