use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::model::{OutcomeRecord, PredictionRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub kept: Option<String>,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub outcomes_in_season: usize,
    pub outcomes_other_season: usize,
    pub outcomes_unknown_date: usize,
    pub winners: usize,
    pub rows_resolved: usize,
    pub rows_unresolved: usize,
    pub conflicts: Vec<Conflict>,
}

struct TeamDayIndex<'a> {
    rows: HashMap<(NaiveDate, &'a str), Vec<usize>>,
}

impl<'a> TeamDayIndex<'a> {
    fn build(records: &'a [PredictionRecord]) -> Self {
        let mut rows: HashMap<(NaiveDate, &'a str), Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            let Some(date) = record.date.known() else {
                continue;
            };
            rows.entry((date, record.home_team.as_str()))
                .or_default()
                .push(idx);
            if record.away_team != record.home_team {
                rows.entry((date, record.away_team.as_str()))
                    .or_default()
                    .push(idx);
            }
        }
        Self { rows }
    }

    fn lookup(&self, date: NaiveDate, team: &'a str) -> &[usize] {
        self.rows
            .get(&(date, team))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// Season ids are compared as numbers when both sides parse ("2025.0" == "2025").
fn same_season(raw: &str, season: &str) -> bool {
    let (raw, season) = (raw.trim(), season.trim());
    match (raw.parse::<f64>(), season.parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => raw == season,
    }
}

/// Fills `result` from the winning side of every in-season outcome.
///
/// Winners are collected per row before anything is written, so the result
/// does not depend on outcome order. A row that collects two different winners
/// keeps the value it had before the pass and is reported as a conflict.
pub fn reconcile(
    records: &mut [PredictionRecord],
    outcomes: &[OutcomeRecord],
    season: &str,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut candidates: HashMap<usize, BTreeSet<&str>> = HashMap::new();

    {
        let index = TeamDayIndex::build(records);
        for outcome in outcomes {
            if !same_season(&outcome.season, season) {
                report.outcomes_other_season += 1;
                continue;
            }
            report.outcomes_in_season += 1;
            let Some(date) = outcome.date.known() else {
                report.outcomes_unknown_date += 1;
                continue;
            };
            if !outcome.won {
                continue;
            }
            report.winners += 1;
            for &idx in index.lookup(date, &outcome.team) {
                candidates
                    .entry(idx)
                    .or_default()
                    .insert(outcome.team.as_str());
            }
        }
    }

    let mut rows: Vec<_> = candidates.into_iter().collect();
    rows.sort_unstable_by_key(|(idx, _)| *idx);

    for (idx, winners) in rows {
        let record = &mut records[idx];
        let Some(date) = record.date.known() else {
            continue;
        };
        let mut names: BTreeSet<String> = winners.into_iter().map(str::to_string).collect();
        if let Some(existing) = &record.result {
            names.insert(existing.clone());
        }

        if names.len() == 1 {
            let winner = names.pop_first();
            if record.result != winner {
                record.result = winner;
                report.rows_resolved += 1;
            }
            continue;
        }

        let conflict = Conflict {
            date,
            home_team: record.home_team.clone(),
            away_team: record.away_team.clone(),
            kept: record.result.clone(),
            candidates: names.into_iter().collect(),
        };
        warn!(
            date = %conflict.date,
            home = %conflict.home_team,
            away = %conflict.away_team,
            candidates = ?conflict.candidates,
            "conflicting winners, result left unchanged"
        );
        report.conflicts.push(conflict);
    }

    report.rows_unresolved = records.iter().filter(|r| r.result.is_none()).count();
    info!(
        resolved = report.rows_resolved,
        unresolved = report.rows_unresolved,
        conflicts = report.conflicts.len(),
        skipped_other_season = report.outcomes_other_season,
        "outcomes reconciled"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::{reconcile, same_season};
    use crate::model::{GameDate, OutcomeRecord, PredictionRecord};
    use chrono::NaiveDate;

    fn date(d: u32) -> GameDate {
        GameDate::Known(NaiveDate::from_ymd_opt(2025, 1, d).unwrap())
    }

    fn row(home: &str, away: &str, d: u32) -> PredictionRecord {
        PredictionRecord {
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_team_prob: Some(0.7),
            odds_home: 1.5,
            odds_away: 2.6,
            result: None,
            date: date(d),
        }
    }

    fn outcome(team: &str, won: bool, d: u32, season: &str) -> OutcomeRecord {
        OutcomeRecord {
            date: date(d),
            team: team.to_string(),
            won,
            season: season.to_string(),
        }
    }

    #[test]
    fn winner_fills_matching_row_only() {
        let mut rows = vec![row("A", "B", 10), row("A", "C", 11)];
        let outcomes = vec![outcome("A", true, 10, "2025"), outcome("B", false, 10, "2025")];
        let report = reconcile(&mut rows, &outcomes, "2025");
        assert_eq!(rows[0].result.as_deref(), Some("A"));
        assert_eq!(rows[1].result, None);
        assert_eq!(report.rows_resolved, 1);
        assert_eq!(report.rows_unresolved, 1);
    }

    #[test]
    fn other_seasons_are_ignored() {
        let mut rows = vec![row("A", "B", 10)];
        let report = reconcile(&mut rows, &[outcome("B", true, 10, "2024")], "2025");
        assert_eq!(rows[0].result, None);
        assert_eq!(report.outcomes_other_season, 1);
    }

    #[test]
    fn reapplying_is_idempotent_and_keeps_identity() {
        let mut rows = vec![row("A", "B", 10), row("A", "B", 10)];
        let outcomes = vec![outcome("B", true, 10, "2025"), outcome("B", true, 10, "2025")];
        reconcile(&mut rows, &outcomes, "2025");
        let first = rows.clone();
        let report = reconcile(&mut rows, &outcomes, "2025");
        assert_eq!(rows, first);
        assert_eq!(report.rows_resolved, 0);
        assert!(rows.iter().all(|r| r.result.as_deref() == Some("B")));
        assert!(rows.iter().all(|r| r.home_team == "A" && r.date == date(10)));
    }

    #[test]
    fn conflicting_winners_are_flagged_not_applied() {
        let mut rows = vec![row("A", "B", 10)];
        let outcomes = vec![outcome("A", true, 10, "2025"), outcome("B", true, 10, "2025")];
        let report = reconcile(&mut rows, &outcomes, "2025");
        assert_eq!(rows[0].result, None);
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].candidates, ["A", "B"]);

        let mut reversed = vec![row("A", "B", 10)];
        let flipped: Vec<_> = outcomes.into_iter().rev().collect();
        reconcile(&mut reversed, &flipped, "2025");
        assert_eq!(reversed, rows);
    }

    #[test]
    fn existing_result_is_not_replaced_by_other_team() {
        let mut resolved = row("A", "B", 10);
        resolved.result = Some("A".to_string());
        let mut rows = vec![resolved];
        let report = reconcile(&mut rows, &[outcome("B", true, 10, "2025")], "2025");
        assert_eq!(rows[0].result.as_deref(), Some("A"));
        assert_eq!(report.conflicts[0].kept.as_deref(), Some("A"));
    }

    #[test]
    fn float_formatted_season_matches() {
        let mut rows = vec![row("A", "B", 10)];
        let outcomes = vec![
            outcome("A", true, 10, "2025.0"),
            outcome("B", false, 10, " 2025 "),
        ];
        let report = reconcile(&mut rows, &outcomes, "2025");
        assert_eq!(rows[0].result.as_deref(), Some("A"));
        assert_eq!(report.outcomes_in_season, 2);
        assert_eq!(report.outcomes_other_season, 0);

        assert!(same_season("2024-25", "2024-25"));
        assert!(!same_season("2024-25", "2025"));
        assert!(!same_season("2024.0", "2025"));
    }

    #[test]
    fn unknown_dates_never_match() {
        let mut undated = row("A", "B", 10);
        undated.date = GameDate::Unknown;
        let mut rows = vec![undated];
        let mut bad = outcome("A", true, 10, "2025");
        bad.date = GameDate::Unknown;
        let report = reconcile(&mut rows, &[bad, outcome("A", true, 10, "2025")], "2025");
        assert_eq!(rows[0].result, None);
        assert_eq!(report.outcomes_unknown_date, 1);
    }
}
