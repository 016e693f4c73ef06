use std::path::PathBuf;

use chrono::{Days, Local, NaiveDate};

use crate::accuracy::{DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD, Thresholds};
use crate::error::{Error, Result};
use crate::locator::FileTemplate;

pub const DEFAULT_MAX_DAYS_BACK: u32 = 120;
pub const DEFAULT_SEASON: &str = "2025";
pub const DEFAULT_PREDICTION_TEMPLATE: &str = "nba_games_predict_{}.csv";
pub const DEFAULT_OUTCOME_TEMPLATE: &str = "nba_games_{}.csv";
pub const DEFAULT_SNAPSHOT_TEMPLATE: &str = "combined_nba_predictions_acc_{}.csv";

/// Directory and file-name settings shared by every binary.
#[derive(Debug, Clone, clap::Args)]
pub struct ArtifactArgs {
    /// Directory holding prediction files.
    #[arg(long, env = "BET_PREDICTION_DIR", default_value = "data/predictions")]
    pub prediction_dir: PathBuf,
    /// Directory holding game statistics (outcome) files.
    #[arg(long, env = "BET_STAT_DIR", default_value = "data/statistics")]
    pub stat_dir: PathBuf,
    /// Directory for ledger snapshots; defaults to the prediction directory.
    #[arg(long, env = "BET_SNAPSHOT_DIR")]
    pub snapshot_dir: Option<PathBuf>,
    #[arg(long, env = "BET_PREDICTION_TEMPLATE", default_value = DEFAULT_PREDICTION_TEMPLATE)]
    pub prediction_template: String,
    #[arg(long, env = "BET_OUTCOME_TEMPLATE", default_value = DEFAULT_OUTCOME_TEMPLATE)]
    pub outcome_template: String,
    #[arg(long, env = "BET_SNAPSHOT_TEMPLATE", default_value = DEFAULT_SNAPSHOT_TEMPLATE)]
    pub snapshot_template: String,
    /// How many days back to look for a file before giving up.
    #[arg(long, env = "BET_MAX_DAYS_BACK", default_value_t = DEFAULT_MAX_DAYS_BACK)]
    pub max_days_back: u32,
    /// Run date; defaults to the local calendar date.
    #[arg(long, env = "BET_TODAY")]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct ScoringArgs {
    /// Rows with home_team_prob above this form the home-favoured subset.
    #[arg(long, env = "BET_HIGH_THRESHOLD", default_value_t = DEFAULT_HIGH_THRESHOLD)]
    pub high_threshold: f64,
    /// Rows with home_team_prob at or below this form the away-favoured subset.
    #[arg(long, env = "BET_LOW_THRESHOLD", default_value_t = DEFAULT_LOW_THRESHOLD)]
    pub low_threshold: f64,
    /// Season identifier outcome rows must carry to be used.
    #[arg(long, env = "BET_CURRENT_SEASON", default_value = DEFAULT_SEASON)]
    pub season: String,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub prediction_dir: PathBuf,
    pub stat_dir: PathBuf,
    pub snapshot_dir: PathBuf,
    pub prediction_template: FileTemplate,
    pub outcome_template: FileTemplate,
    pub snapshot_template: FileTemplate,
    pub max_days_back: u32,
    pub season: String,
    pub thresholds: Thresholds,
    pub today: NaiveDate,
}

impl RunConfig {
    pub fn from_args(artifacts: ArtifactArgs, scoring: ScoringArgs) -> Result<Self> {
        let season = scoring.season.trim().to_string();
        if season.is_empty() {
            return Err(Error::InvalidConfig("season must not be empty".to_string()));
        }
        let snapshot_dir = artifacts
            .snapshot_dir
            .unwrap_or_else(|| artifacts.prediction_dir.clone());
        Ok(Self {
            prediction_template: FileTemplate::new(artifacts.prediction_template)?,
            outcome_template: FileTemplate::new(artifacts.outcome_template)?,
            snapshot_template: FileTemplate::new(artifacts.snapshot_template)?,
            prediction_dir: artifacts.prediction_dir,
            stat_dir: artifacts.stat_dir,
            snapshot_dir,
            max_days_back: artifacts.max_days_back,
            season,
            thresholds: Thresholds::new(scoring.high_threshold, scoring.low_threshold)?,
            today: artifacts.today.unwrap_or_else(|| Local::now().date_naive()),
        })
    }

    pub fn with_base_dir(base: impl Into<PathBuf>, today: NaiveDate) -> Result<Self> {
        let base = base.into();
        Ok(Self {
            prediction_dir: base.join("predictions"),
            stat_dir: base.join("statistics"),
            snapshot_dir: base.join("predictions"),
            prediction_template: FileTemplate::new(DEFAULT_PREDICTION_TEMPLATE)?,
            outcome_template: FileTemplate::new(DEFAULT_OUTCOME_TEMPLATE)?,
            snapshot_template: FileTemplate::new(DEFAULT_SNAPSHOT_TEMPLATE)?,
            max_days_back: DEFAULT_MAX_DAYS_BACK,
            season: DEFAULT_SEASON.to_string(),
            thresholds: Thresholds::default(),
            today,
        })
    }

    pub fn yesterday(&self) -> NaiveDate {
        self.today
            .checked_sub_days(Days::new(1))
            .unwrap_or(self.today)
    }

    pub fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.snapshot_dir.join(self.snapshot_template.render(date))
    }
}
