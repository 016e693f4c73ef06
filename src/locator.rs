use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::error::{ArtifactKind, Error, Result};
use crate::model::DATE_FORMAT;

const PLACEHOLDER: &str = "{}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTemplate(String);

impl FileTemplate {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.matches(PLACEHOLDER).count() != 1 {
            return Err(Error::InvalidConfig(format!(
                "file template '{raw}' must contain exactly one '{PLACEHOLDER}'"
            )));
        }
        Ok(Self(raw))
    }

    pub fn render(&self, date: NaiveDate) -> String {
        let day = date.format(DATE_FORMAT).to_string();
        self.0.replacen(PLACEHOLDER, &day, 1)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub path: PathBuf,
    pub date: NaiveDate,
}

/// Walks back from `reference` one day at a time, at most `max_days` days, and
/// returns the first date accepted by `exists`.
pub fn search_back(
    reference: NaiveDate,
    max_days: u32,
    mut exists: impl FnMut(NaiveDate) -> bool,
) -> Option<NaiveDate> {
    (0..=u64::from(max_days))
        .map_while(|back| reference.checked_sub_days(Days::new(back)))
        .find(|date| exists(*date))
}

pub fn window_start(reference: NaiveDate, max_days: u32) -> NaiveDate {
    reference
        .checked_sub_days(Days::new(u64::from(max_days)))
        .unwrap_or(NaiveDate::MIN)
}

pub fn locate(
    kind: ArtifactKind,
    dir: &Path,
    template: &FileTemplate,
    reference: NaiveDate,
    max_days: u32,
) -> Result<Located> {
    let found = search_back(reference, max_days, |date| {
        let candidate = dir.join(template.render(date));
        debug!(%kind, path = %candidate.display(), "checking");
        candidate.is_file()
    });

    match found {
        Some(date) => Ok(Located {
            path: dir.join(template.render(date)),
            date,
        }),
        None => Err(Error::ArtifactNotFound {
            kind,
            dir: dir.to_path_buf(),
            template: template.as_str().to_string(),
            newest: reference,
            oldest: window_start(reference, max_days),
        }),
    }
}
