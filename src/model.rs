use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const SNAPSHOT_COLUMNS: [&str; 7] = [
    "home_team",
    "away_team",
    "home_team_prob",
    "odds_home",
    "odds_away",
    "result",
    "date",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GameDate {
    Known(NaiveDate),
    Unknown,
}

impl GameDate {
    pub fn known(self) -> Option<NaiveDate> {
        match self {
            Self::Known(date) => Some(date),
            Self::Unknown => None,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Newest first, unknown dates last.
    pub fn cmp_desc(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Known(a), Self::Known(b)) => b.cmp(a),
            (Self::Known(_), Self::Unknown) => Ordering::Less,
            (Self::Unknown, Self::Known(_)) => Ordering::Greater,
            (Self::Unknown, Self::Unknown) => Ordering::Equal,
        }
    }
}

impl fmt::Display for GameDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            Self::Unknown => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub home_team: String,
    pub away_team: String,
    // None when the source value was not numeric.
    pub home_team_prob: Option<f64>,
    pub odds_home: f64,
    pub odds_away: f64,
    pub result: Option<String>,
    pub date: GameDate,
}

impl PredictionRecord {
    pub fn key(&self) -> MatchupKey<'_> {
        MatchupKey {
            date: self.date,
            home_team: &self.home_team,
            away_team: &self.away_team,
        }
    }

    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    pub fn is_complete(&self) -> bool {
        self.result.is_some() && self.home_team_prob.is_some() && self.date.is_known()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchupKey<'a> {
    pub date: GameDate,
    pub home_team: &'a str,
    pub away_team: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub date: GameDate,
    pub team: String,
    pub won: bool,
    pub season: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    pub home_team: String,
    pub away_team: String,
    pub home_team_prob: f64,
    pub odds_home: f64,
    pub odds_away: f64,
    pub result: String,
    pub date: NaiveDate,
    pub accuracy: u8,
}

impl ScoredRecord {
    pub fn is_correct(&self) -> bool {
        self.accuracy == 1
    }

    pub fn to_record(&self) -> PredictionRecord {
        PredictionRecord {
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            home_team_prob: Some(self.home_team_prob),
            odds_home: self.odds_home,
            odds_away: self.odds_away,
            result: Some(self.result.clone()),
            date: GameDate::Known(self.date),
        }
    }
}
