//! Per-day activity records and the pre-built ideas feed.
//!
//! An [`ActivityRecord`] is read-only input: either loaded from the ideas feed
//! (`{"daily": {"YYYY-MM-DD": {...}}}`) or assembled from raw commits by the
//! aggregator. Eligibility for generation is decided here.

use crate::error::DevlogError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date key.
pub fn parse_date(raw: &str) -> Result<NaiveDate, DevlogError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| DevlogError::InvalidDate(raw.to_string()))
}

/// One normalized commit from a tracked repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEntry {
    pub sha: String,
    /// Author date as reported by git (`%ai`), sortable lexically within one offset
    pub timestamp: String,
    pub message: String,
    pub project: String,
    pub repo_path: PathBuf,
}

impl CommitEntry {
    pub fn short_sha(&self) -> &str {
        let end = self
            .sha
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.sha.len());
        &self.sha[..end]
    }
}

/// The raw signal available for a day
#[derive(Debug, Clone, PartialEq)]
pub enum ActivitySignal {
    /// Pre-extracted, free-form idea objects from the feed
    Ideas(Vec<Value>),
    /// Raw commits collected by the aggregator
    Commits(Vec<CommitEntry>),
}

impl ActivitySignal {
    pub fn is_empty(&self) -> bool {
        match self {
            ActivitySignal::Ideas(ideas) => ideas.is_empty(),
            ActivitySignal::Commits(commits) => commits.is_empty(),
        }
    }
}

/// Activity for a single calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub date: NaiveDate,
    pub projects: Vec<String>,
    pub commit_count: u64,
    pub signal: ActivitySignal,
    /// Upstream error marker; a marked record is never generated
    pub error: Option<String>,
}

impl ActivityRecord {
    /// Build a record from aggregated commits. Projects keep first-seen order.
    pub fn from_commits(date: NaiveDate, commits: Vec<CommitEntry>) -> Self {
        let mut projects: Vec<String> = Vec::new();
        for commit in &commits {
            if !projects.iter().any(|p| p == &commit.project) {
                projects.push(commit.project.clone());
            }
        }
        Self {
            date,
            projects,
            commit_count: commits.len() as u64,
            signal: ActivitySignal::Commits(commits),
            error: None,
        }
    }

    pub fn date_key(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    pub fn has_signal(&self) -> bool {
        !self.signal.is_empty()
    }

    /// No error marker and at least one idea or commit.
    pub fn is_eligible(&self) -> bool {
        self.error.is_none() && self.has_signal()
    }
}

#[derive(Debug, Deserialize)]
struct RawFeed {
    #[serde(default)]
    daily: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDay {
    #[serde(default)]
    projects: Vec<String>,
    #[serde(default)]
    commit_count: u64,
    #[serde(default)]
    ideas: Vec<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Day records loaded from the pre-built ideas feed, keyed by date
#[derive(Debug, Clone, Default)]
pub struct IdeasFeed {
    pub days: BTreeMap<NaiveDate, ActivityRecord>,
}

impl IdeasFeed {
    /// Load and validate the feed file.
    ///
    /// A missing file, unparsable JSON, or a missing/empty `daily` mapping is a
    /// configuration error. Individual malformed days are kept but carry an
    /// error marker so the selector excludes them.
    pub fn load(path: &Path) -> Result<Self, DevlogError> {
        if !path.exists() {
            return Err(DevlogError::FeedNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let feed = Self::from_json_str(&text)
            .map_err(|e| DevlogError::FeedInvalid(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), days = feed.len(), "Loaded ideas feed");
        Ok(feed)
    }

    pub fn from_json_str(text: &str) -> Result<Self, String> {
        let raw: RawFeed = serde_json::from_str(text).map_err(|e| e.to_string())?;
        let daily = match raw.daily {
            Some(Value::Object(map)) if !map.is_empty() => map,
            _ => return Err("no daily ideas found".to_string()),
        };

        let mut days = BTreeMap::new();
        for (key, value) in daily {
            let date = match parse_date(&key) {
                Ok(date) => date,
                Err(_) => {
                    warn!(key = %key, "Skipping feed entry with malformed date key");
                    continue;
                }
            };
            let record = match serde_json::from_value::<RawDay>(value) {
                Ok(raw_day) => ActivityRecord {
                    date,
                    projects: raw_day.projects,
                    commit_count: raw_day.commit_count,
                    signal: ActivitySignal::Ideas(raw_day.ideas),
                    error: raw_day.error.as_ref().and_then(error_marker),
                },
                Err(e) => ActivityRecord {
                    date,
                    projects: Vec::new(),
                    commit_count: 0,
                    signal: ActivitySignal::Ideas(Vec::new()),
                    error: Some(format!("malformed day entry: {}", e)),
                },
            };
            days.insert(date, record);
        }

        Ok(Self { days })
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ActivityRecord> {
        self.days.values()
    }
}

/// Any truthy JSON value counts as an upstream error marker.
fn error_marker(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
