use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::accuracy::{self, Metrics};
use crate::artifact::{self, DataQuality};
use crate::config::RunConfig;
use crate::error::{ArtifactKind, AtStage, Error, PipelineError, Stage};
use crate::ledger::{self, MergeStats};
use crate::locator::{self, Located};
use crate::model::PredictionRecord;
use crate::reconcile::{self, ReconcileReport};

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub today: NaiveDate,
    pub prediction_file: PathBuf,
    pub prediction_date: NaiveDate,
    pub prior_snapshot: Option<PathBuf>,
    pub outcome_file: PathBuf,
    pub outcome_date: NaiveDate,
    pub merge: MergeStats,
    pub quality: DataQuality,
    pub reconcile: ReconcileReport,
    pub metrics: Metrics,
    pub snapshot: PathBuf,
}

pub struct Pipeline {
    config: RunConfig,
}

impl Pipeline {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        let cfg = &self.config;
        info!(today = %cfg.today, from = %cfg.yesterday(), "looking for prediction data");

        let predictions = locator::locate(
            ArtifactKind::Predictions,
            &cfg.prediction_dir,
            &cfg.prediction_template,
            cfg.yesterday(),
            cfg.max_days_back,
        )
        .at(Stage::LocatePrediction)?;
        info!(
            date = %predictions.date,
            path = %predictions.path.display(),
            "prediction file found"
        );

        let prior = self.prior_snapshot(predictions.date).at(Stage::MergeLedger)?;
        let mut ledger = ledger::load_and_merge(
            prior.as_ref().map(|found| found.path.as_path()),
            &predictions.path,
        )
        .at(Stage::MergeLedger)?;

        let outcomes = locator::locate(
            ArtifactKind::Outcomes,
            &cfg.stat_dir,
            &cfg.outcome_template,
            cfg.today,
            cfg.max_days_back,
        )
        .at(Stage::LocateOutcomes)?;
        info!(date = %outcomes.date, path = %outcomes.path.display(), "statistics file found");

        let outcome_batch = artifact::read_outcomes(&outcomes.path).at(Stage::Reconcile)?;
        let mut quality = ledger.quality;
        quality.absorb(outcome_batch.quality);
        let reconcile_report =
            reconcile::reconcile(&mut ledger.records, &outcome_batch.records, &cfg.season);

        let scored = accuracy::score(&ledger.records, cfg.thresholds);
        for line in accuracy::summary_lines(&scored.metrics) {
            info!("{line}");
        }

        let snapshot = cfg.snapshot_path(cfg.today);
        let rows: Vec<PredictionRecord> = scored.records.iter().map(|r| r.to_record()).collect();
        artifact::write_snapshot(&snapshot, &rows).at(Stage::Persist)?;
        info!(path = %snapshot.display(), rows = rows.len(), "ledger snapshot written");

        Ok(RunSummary {
            today: cfg.today,
            prediction_file: predictions.path,
            prediction_date: predictions.date,
            prior_snapshot: prior.map(|found| found.path),
            outcome_file: outcomes.path,
            outcome_date: outcomes.date,
            merge: ledger.stats,
            quality,
            reconcile: reconcile_report,
            metrics: scored.metrics,
            snapshot,
        })
    }

    fn prior_snapshot(&self, prediction_date: NaiveDate) -> Result<Option<Located>, Error> {
        let cfg = &self.config;
        match locator::locate(
            ArtifactKind::Snapshot,
            &cfg.snapshot_dir,
            &cfg.snapshot_template,
            prediction_date,
            cfg.max_days_back,
        ) {
            Ok(found) => Ok(Some(found)),
            Err(Error::ArtifactNotFound { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }
}
