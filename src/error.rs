use std::fmt;
use std::io;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Predictions,
    Outcomes,
    Snapshot,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Predictions => "prediction",
            Self::Outcomes => "outcome",
            Self::Snapshot => "ledger snapshot",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "no {kind} file matching '{template}' in {} between {oldest} and {newest}",
        .dir.display()
    )]
    ArtifactNotFound {
        kind: ArtifactKind,
        dir: PathBuf,
        template: String,
        newest: NaiveDate,
        oldest: NaiveDate,
    },
    #[error(
        "{}: row {row}: column '{column}' has malformed number '{value}'",
        .path.display()
    )]
    MalformedNumber {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },
    #[error("{}: missing column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("{}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    LocatePrediction,
    MergeLedger,
    LocateOutcomes,
    Reconcile,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LocatePrediction => "locate predictions",
            Self::MergeLedger => "merge ledger",
            Self::LocateOutcomes => "locate outcomes",
            Self::Reconcile => "reconcile outcomes",
            Self::Persist => "persist snapshot",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("stage '{stage}' failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

pub(crate) trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|source| PipelineError { stage, source })
    }
}
