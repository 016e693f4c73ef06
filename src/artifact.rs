use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{GameDate, OutcomeRecord, PredictionRecord, SNAPSHOT_COLUMNS};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

// Prediction files name the odds columns "odds 1" / "odds 2".
const HOME_TEAM: &[&str] = &["home_team"];
const AWAY_TEAM: &[&str] = &["away_team"];
const HOME_PROB: &[&str] = &["home_team_prob"];
const ODDS_HOME: &[&str] = &["odds_home", "odds 1"];
const ODDS_AWAY: &[&str] = &["odds_away", "odds 2"];
const RESULT: &[&str] = &["result"];
const DATE: &[&str] = &["date"];
const TEAM: &[&str] = &["team"];
const WON: &[&str] = &["won"];
const SEASON: &[&str] = &["season"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataQuality {
    pub non_numeric_probs: usize,
    pub unknown_dates: usize,
    pub unreadable_won: usize,
}

impl DataQuality {
    pub fn absorb(&mut self, other: DataQuality) {
        self.non_numeric_probs += other.non_numeric_probs;
        self.unknown_dates += other.unknown_dates;
        self.unreadable_won += other.unreadable_won;
    }

    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PredictionBatch {
    pub records: Vec<PredictionRecord>,
    pub quality: DataQuality,
}

#[derive(Debug, Clone, Default)]
pub struct OutcomeBatch {
    pub records: Vec<OutcomeRecord>,
    pub quality: DataQuality,
}

pub fn parse_decimal(raw: &str) -> Option<f64> {
    let normalized = raw.trim().replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

pub fn parse_date(raw: &str) -> GameDate {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return GameDate::Unknown;
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return GameDate::Known(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return GameDate::Known(ts.date());
        }
    }
    GameDate::Unknown
}

pub fn parse_won(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "t" | "yes" => Some(true),
        "0" | "0.0" | "false" | "f" | "no" => Some(false),
        _ => None,
    }
}

fn parse_result(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return None;
    }
    Some(trimmed.to_string())
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

fn reader(content: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes())
}

struct Header<'a> {
    path: &'a Path,
    names: StringRecord,
}

impl<'a> Header<'a> {
    fn read(path: &'a Path, csv: &mut csv::Reader<&[u8]>) -> Result<Self> {
        let names = csv.headers().map_err(|e| Error::csv(path, e))?.clone();
        Ok(Self { path, names })
    }

    fn find(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.names.iter().position(|name| name == *alias))
    }

    fn name(&self, idx: usize) -> &str {
        self.names.get(idx).unwrap_or("")
    }

    fn require(&self, aliases: &[&str]) -> Result<usize> {
        self.find(aliases).ok_or_else(|| Error::MissingColumn {
            path: self.path.to_path_buf(),
            column: aliases.join(" | "),
        })
    }
}

struct PredictionColumns {
    home_team: usize,
    away_team: usize,
    home_team_prob: usize,
    odds_home: usize,
    odds_away: usize,
    result: Option<usize>,
    date: usize,
}

impl PredictionColumns {
    fn resolve(header: &Header<'_>) -> Result<Self> {
        Ok(Self {
            home_team: header.require(HOME_TEAM)?,
            away_team: header.require(AWAY_TEAM)?,
            home_team_prob: header.require(HOME_PROB)?,
            odds_home: header.require(ODDS_HOME)?,
            odds_away: header.require(ODDS_AWAY)?,
            result: header.find(RESULT),
            date: header.require(DATE)?,
        })
    }
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

fn odds(
    path: &Path,
    row: usize,
    header: &Header<'_>,
    idx: usize,
    record: &StringRecord,
) -> Result<f64> {
    let raw = field(record, idx);
    parse_decimal(raw).ok_or_else(|| Error::MalformedNumber {
        path: path.to_path_buf(),
        row,
        column: header.name(idx).to_string(),
        value: raw.to_string(),
    })
}

/// Reads a prediction artifact or a ledger snapshot.
///
/// Malformed odds reject the whole file. A non-numeric probability or an
/// unparseable date is kept as an unknown marker and counted.
pub fn read_predictions(path: &Path) -> Result<PredictionBatch> {
    let content = read_text(path)?;
    let mut csv = reader(&content);
    let header = Header::read(path, &mut csv)?;
    let cols = PredictionColumns::resolve(&header)?;

    let mut batch = PredictionBatch::default();
    for (idx, row) in csv.records().enumerate() {
        let row_no = idx + 1;
        let record = row.map_err(|e| Error::csv(path, e))?;
        if is_blank(&record) {
            continue;
        }

        let prob_raw = field(&record, cols.home_team_prob);
        let home_team_prob = parse_decimal(prob_raw);
        if home_team_prob.is_none() {
            warn!(
                path = %path.display(),
                row = row_no,
                value = prob_raw,
                "home_team_prob is not numeric"
            );
            batch.quality.non_numeric_probs += 1;
        }

        let date_raw = field(&record, cols.date);
        let date = parse_date(date_raw);
        if !date.is_known() {
            warn!(path = %path.display(), row = row_no, value = date_raw, "unparseable date");
            batch.quality.unknown_dates += 1;
        }

        batch.records.push(PredictionRecord {
            home_team: field(&record, cols.home_team).trim().to_string(),
            away_team: field(&record, cols.away_team).trim().to_string(),
            home_team_prob,
            odds_home: odds(path, row_no, &header, cols.odds_home, &record)?,
            odds_away: odds(path, row_no, &header, cols.odds_away, &record)?,
            result: cols
                .result
                .and_then(|idx| parse_result(field(&record, idx))),
            date,
        });
    }
    Ok(batch)
}

pub fn read_outcomes(path: &Path) -> Result<OutcomeBatch> {
    let content = read_text(path)?;
    let mut csv = reader(&content);
    let header = Header::read(path, &mut csv)?;
    let date_col = header.require(DATE)?;
    let team_col = header.require(TEAM)?;
    let won_col = header.require(WON)?;
    let season_col = header.require(SEASON)?;

    let mut batch = OutcomeBatch::default();
    for (idx, row) in csv.records().enumerate() {
        let record = row.map_err(|e| Error::csv(path, e))?;
        if is_blank(&record) {
            continue;
        }

        let date = parse_date(field(&record, date_col));
        if !date.is_known() {
            batch.quality.unknown_dates += 1;
        }
        let won_raw = field(&record, won_col);
        let won = parse_won(won_raw).unwrap_or_else(|| {
            warn!(path = %path.display(), row = idx + 1, value = won_raw, "unreadable won flag");
            batch.quality.unreadable_won += 1;
            false
        });

        batch.records.push(OutcomeRecord {
            date,
            team: field(&record, team_col).trim().to_string(),
            won,
            season: field(&record, season_col).trim().to_string(),
        });
    }
    if batch.quality.unknown_dates > 0 {
        warn!(
            path = %path.display(),
            rows = batch.quality.unknown_dates,
            "outcome rows with unparseable dates"
        );
    }
    Ok(batch)
}

pub fn write_snapshot(path: &Path, records: &[PredictionRecord]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }

    let mut out = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    out.write_record(SNAPSHOT_COLUMNS)
        .map_err(|e| Error::csv(path, e))?;
    for r in records {
        out.write_record([
            r.home_team.clone(),
            r.away_team.clone(),
            r.home_team_prob.map(|p| p.to_string()).unwrap_or_default(),
            r.odds_home.to_string(),
            r.odds_away.to_string(),
            r.result.clone().unwrap_or_default(),
            r.date.to_string(),
        ])
        .map_err(|e| Error::csv(path, e))?;
    }
    let bytes = out
        .into_inner()
        .map_err(|e| Error::io(path, e.into_error()))?;

    let tmp = tmp_path(path);
    fs::write(&tmp, bytes).map_err(|e| Error::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(Error::io(path, e));
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
