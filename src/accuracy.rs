use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{PredictionRecord, ScoredRecord};

pub const DEFAULT_HIGH_THRESHOLD: f64 = 0.6;
pub const DEFAULT_LOW_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub high: f64,
    pub low: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high: DEFAULT_HIGH_THRESHOLD,
            low: DEFAULT_LOW_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn new(high: f64, low: f64) -> Result<Self> {
        for (name, value) in [("high", high), ("low", low)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{name} threshold {value} is outside [0, 1]"
                )));
            }
        }
        Ok(Self { high, low })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HitRate {
    pub samples: usize,
    pub correct: usize,
    pub accuracy: Option<f64>,
}

impl HitRate {
    fn from_rows<'a>(rows: impl Iterator<Item = &'a ScoredRecord>) -> Self {
        let (samples, correct) = rows.fold((0usize, 0usize), |(n, c), r| {
            (n + 1, c + usize::from(r.is_correct()))
        });
        let accuracy = (samples > 0).then(|| correct as f64 / samples as f64);
        Self {
            samples,
            correct,
            accuracy,
        }
    }
}

impl fmt::Display for HitRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.accuracy {
            Some(acc) => write!(f, "{:.2}% ({}/{})", acc * 100.0, self.correct, self.samples),
            None => write!(f, "n/a (no rows)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub thresholds: Thresholds,
    pub rows_scored: usize,
    pub rows_dropped: usize,
    pub overall: HitRate,
    pub high: HitRate,
    pub low: HitRate,
    pub brier: Option<f64>,
    pub log_loss: Option<f64>,
    /// Mean profit per unit staked on the predicted side at the listed odds.
    pub flat_stake_roi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub records: Vec<ScoredRecord>,
    pub metrics: Metrics,
}

/// Home pick when `prob >= 0.5`, away pick otherwise.
pub fn is_correct(home_team_prob: f64, result: &str, home_team: &str, away_team: &str) -> bool {
    (home_team_prob >= 0.5 && result == home_team) || (home_team_prob < 0.5 && result == away_team)
}

fn finalize(record: &PredictionRecord) -> Option<ScoredRecord> {
    let prob = record.home_team_prob?;
    let result = record.result.as_deref()?;
    let date = record.date.known()?;
    let correct = is_correct(prob, result, &record.home_team, &record.away_team);
    Some(ScoredRecord {
        home_team: record.home_team.clone(),
        away_team: record.away_team.clone(),
        home_team_prob: prob,
        odds_home: record.odds_home,
        odds_away: record.odds_away,
        result: result.to_string(),
        date,
        accuracy: u8::from(correct),
    })
}

pub fn score(records: &[PredictionRecord], thresholds: Thresholds) -> Scored {
    let non_numeric = records
        .iter()
        .filter(|r| r.home_team_prob.is_none())
        .count();
    if non_numeric > 0 {
        warn!(
            rows = non_numeric,
            "home_team_prob could not be read as a number; rows excluded"
        );
    }

    let scored: Vec<ScoredRecord> = records.iter().filter_map(finalize).collect();
    let metrics = Metrics {
        thresholds,
        rows_scored: scored.len(),
        rows_dropped: records.len() - scored.len(),
        overall: HitRate::from_rows(scored.iter()),
        high: HitRate::from_rows(scored.iter().filter(|r| r.home_team_prob > thresholds.high)),
        low: HitRate::from_rows(scored.iter().filter(|r| r.home_team_prob <= thresholds.low)),
        brier: brier(&scored),
        log_loss: log_loss(&scored),
        flat_stake_roi: flat_stake_roi(&scored),
    };

    Scored {
        records: scored,
        metrics,
    }
}

pub fn summary_lines(metrics: &Metrics) -> Vec<String> {
    let t = metrics.thresholds;
    let mut lines = vec![
        format!("Overall accuracy: {}", metrics.overall),
        format!("Accuracy for home_team_prob above {:.2}: {}", t.high, metrics.high),
        format!(
            "Accuracy for home_team_prob at or below {:.2} (away team favoured): {}",
            t.low, metrics.low
        ),
    ];
    if let Some(brier) = metrics.brier {
        lines.push(format!("Brier score: {brier:.4}"));
    }
    if let Some(ll) = metrics.log_loss {
        lines.push(format!("Log loss: {ll:.4}"));
    }
    if let Some(roi) = metrics.flat_stake_roi {
        lines.push(format!("Flat-stake ROI: {:+.2}%", roi * 100.0));
    }
    if metrics.rows_dropped > 0 {
        lines.push(format!("Rows dropped as incomplete: {}", metrics.rows_dropped));
    }
    lines
}

// Rows whose result names neither side carry no home/away label.
fn home_won(r: &ScoredRecord) -> Option<f64> {
    if r.result == r.home_team {
        Some(1.0)
    } else if r.result == r.away_team {
        Some(0.0)
    } else {
        None
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0_f64, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn brier(rows: &[ScoredRecord]) -> Option<f64> {
    mean(
        rows.iter()
            .filter_map(|r| home_won(r).map(|y| (r.home_team_prob - y).powi(2))),
    )
}

fn log_loss(rows: &[ScoredRecord]) -> Option<f64> {
    mean(rows.iter().filter_map(|r| {
        home_won(r).map(|y| {
            let p = if y > 0.5 {
                r.home_team_prob
            } else {
                1.0 - r.home_team_prob
            };
            -p.clamp(1e-12, 1.0).ln()
        })
    }))
}

fn flat_stake_roi(rows: &[ScoredRecord]) -> Option<f64> {
    mean(rows.iter().map(|r| {
        let odds = if r.home_team_prob >= 0.5 {
            r.odds_home
        } else {
            r.odds_away
        };
        if r.is_correct() { odds - 1.0 } else { -1.0 }
    }))
}

#[cfg(test)]
mod tests {
    use super::{Thresholds, is_correct, score};
    use crate::model::{GameDate, PredictionRecord};
    use chrono::NaiveDate;

    fn row(prob: Option<f64>, result: Option<&str>) -> PredictionRecord {
        PredictionRecord {
            home_team: "A".to_string(),
            away_team: "B".to_string(),
            home_team_prob: prob,
            odds_home: 1.5,
            odds_away: 2.5,
            result: result.map(str::to_string),
            date: GameDate::Known(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()),
        }
    }

    #[test]
    fn correctness_follows_favoured_side() {
        assert!(is_correct(0.5, "A", "A", "B"));
        assert!(is_correct(0.49, "B", "A", "B"));
        assert!(!is_correct(0.7, "B", "A", "B"));
        assert!(!is_correct(0.3, "A", "A", "B"));
    }

    #[test]
    fn all_correct_and_none_correct() {
        let good = [row(Some(0.8), Some("A")), row(Some(0.2), Some("B"))];
        let good = score(&good, Thresholds::default());
        assert_eq!(good.metrics.overall.accuracy, Some(1.0));
        let bad = [row(Some(0.8), Some("B")), row(Some(0.2), Some("A"))];
        let bad = score(&bad, Thresholds::default());
        assert_eq!(bad.metrics.overall.accuracy, Some(0.0));
    }

    #[test]
    fn empty_subset_is_none_not_zero() {
        let scored = score(&[row(Some(0.55), Some("A"))], Thresholds::default());
        assert_eq!(scored.metrics.overall.accuracy, Some(1.0));
        assert_eq!(scored.metrics.high.accuracy, None);
        assert_eq!(scored.metrics.low.accuracy, None);
        assert_eq!(scored.metrics.high.to_string(), "n/a (no rows)");
    }

    #[test]
    fn incomplete_rows_are_dropped() {
        let scored = score(
            &[row(None, Some("A")), row(Some(0.7), None), row(Some(0.7), Some("A"))],
            Thresholds::default(),
        );
        assert_eq!(scored.records.len(), 1);
        assert_eq!(scored.metrics.rows_dropped, 2);
        assert_eq!(scored.records[0].accuracy, 1);
    }

    #[test]
    fn band_edges_follow_inclusivity() {
        let rows = [row(Some(0.6), Some("A")), row(Some(0.4), Some("B"))];
        let scored = score(&rows, Thresholds::default());
        assert_eq!(scored.metrics.high.samples, 0);
        assert_eq!(scored.metrics.low.samples, 1);
    }

    #[test]
    fn thresholds_are_independent() {
        let t = Thresholds::new(0.55, 0.30).expect("valid thresholds");
        let scored = score(&[row(Some(0.58), Some("A")), row(Some(0.35), Some("B"))], t);
        assert_eq!(scored.metrics.high.samples, 1);
        assert_eq!(scored.metrics.low.samples, 0);
        assert!(Thresholds::new(1.2, 0.4).is_err());
    }

    #[test]
    fn roi_pays_out_odds_minus_stake() {
        let rows = [row(Some(0.7), Some("A")), row(Some(0.3), Some("A"))];
        let scored = score(&rows, Thresholds::default());
        let roi = scored.metrics.flat_stake_roi.expect("two rows");
        assert!((roi - (0.5 - 1.0) / 2.0).abs() < 1e-12);
    }
}
