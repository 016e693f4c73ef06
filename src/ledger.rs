use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::artifact::{self, DataQuality};
use crate::error::Result;
use crate::model::{MatchupKey, PredictionRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub prior_rows: usize,
    pub new_rows: usize,
    pub appended: usize,
    pub duplicates_skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub records: Vec<PredictionRecord>,
    pub stats: MergeStats,
    pub quality: DataQuality,
}

impl Ledger {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Appends `batch` to `prior`, skipping rows whose (date, home, away) triple is
/// already present, then orders the result newest first.
pub fn merge(prior: Vec<PredictionRecord>, batch: Vec<PredictionRecord>) -> Ledger {
    let mut stats = MergeStats {
        prior_rows: prior.len(),
        new_rows: batch.len(),
        ..MergeStats::default()
    };

    let keep: Vec<bool> = {
        let mut seen: HashSet<MatchupKey<'_>> = prior.iter().map(PredictionRecord::key).collect();
        batch
            .iter()
            .map(|record| {
                let fresh = seen.insert(record.key());
                if !fresh {
                    debug!(
                        home = %record.home_team,
                        away = %record.away_team,
                        date = %record.date,
                        "matchup already in ledger"
                    );
                }
                fresh
            })
            .collect()
    };

    let mut records = prior;
    for (record, fresh) in batch.into_iter().zip(keep) {
        if fresh {
            records.push(record);
            stats.appended += 1;
        } else {
            stats.duplicates_skipped += 1;
        }
    }

    records.sort_by(|a, b| a.date.cmp_desc(&b.date));

    Ledger {
        records,
        stats,
        quality: DataQuality::default(),
    }
}

pub fn load_and_merge(prior_snapshot: Option<&Path>, predictions: &Path) -> Result<Ledger> {
    let mut quality = DataQuality::default();

    let prior = match prior_snapshot {
        Some(path) => {
            let batch = artifact::read_predictions(path)?;
            info!(path = %path.display(), rows = batch.records.len(), "loaded prior ledger");
            quality.absorb(batch.quality);
            batch.records
        }
        None => {
            info!("no prior ledger snapshot, starting empty");
            Vec::new()
        }
    };

    let batch = artifact::read_predictions(predictions)?;
    info!(path = %predictions.display(), rows = batch.records.len(), "loaded predictions");
    quality.absorb(batch.quality);

    let mut ledger = merge(prior, batch.records);
    ledger.quality = quality;
    info!(
        rows = ledger.len(),
        appended = ledger.stats.appended,
        skipped = ledger.stats.duplicates_skipped,
        "combined predictions updated"
    );
    Ok(ledger)
}
