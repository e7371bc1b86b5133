//! Git-derived activity aggregation.
//!
//! Collects one calendar day of non-merge commits across every tracked
//! repository. The day boundary is always evaluated at one configured fixed
//! UTC offset, never the host's local clock. Repositories that are missing or
//! whose log query fails are skipped; partial data is acceptable.

use crate::activity::{ActivityRecord, CommitEntry, DATE_FORMAT};
use crate::error::DevlogError;
use crate::overrides::LabelOverrides;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Parse `+HH:MM` / `-HH:MM` (or `Z`) into a fixed offset.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, DevlogError> {
    let invalid = || DevlogError::ConfigError(format!("Invalid timezone offset: {}", raw));
    let raw = raw.trim();
    if raw == "Z" || raw == "UTC" {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match raw.chars().next() {
        Some('+') => (1, &raw[1..]),
        Some('-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// The day before today, as seen at `offset`.
pub fn yesterday(offset: FixedOffset) -> NaiveDate {
    let today = Utc::now().with_timezone(&offset).date_naive();
    today.pred_opt().unwrap_or(today)
}

/// One calendar day at a fixed offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub offset: FixedOffset,
}

impl DayWindow {
    pub fn new(date: NaiveDate, offset: FixedOffset) -> Self {
        Self { date, offset }
    }

    /// `--since` value: first second of the day with an explicit offset
    pub fn since(&self) -> String {
        format!("{}T00:00:00{}", self.date.format(DATE_FORMAT), self.offset)
    }

    /// `--until` value: last second of the day with an explicit offset
    pub fn until(&self) -> String {
        format!("{}T23:59:59{}", self.date.format(DATE_FORMAT), self.offset)
    }
}

/// A tracked repository and the project label it reports under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub path: PathBuf,
    pub label: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRepository {
    Triple(Vec<String>),
    Named {
        path: String,
        #[serde(alias = "project", alias = "name")]
        label: String,
    },
}

/// External list of `(path, label, description)` entries; only the first two are used
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryRegistry {
    pub repositories: Vec<RepositoryRef>,
}

impl RepositoryRegistry {
    pub fn load(path: &Path) -> Result<Self, DevlogError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DevlogError::ConfigError(format!(
                "Failed to read repository registry {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&text).map_err(|e| {
            DevlogError::ConfigError(format!("Invalid repository registry {}: {}", path.display(), e))
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, String> {
        let raw: Vec<RawRepository> = serde_json::from_str(text).map_err(|e| e.to_string())?;
        let mut repositories = Vec::with_capacity(raw.len());
        for (i, entry) in raw.into_iter().enumerate() {
            let repo = match entry {
                RawRepository::Triple(fields) if fields.len() >= 2 => RepositoryRef {
                    path: PathBuf::from(&fields[0]),
                    label: fields[1].clone(),
                },
                RawRepository::Triple(_) => {
                    return Err(format!("entry {} needs at least a path and a label", i))
                }
                RawRepository::Named { path, label } => RepositoryRef {
                    path: PathBuf::from(path),
                    label,
                },
            };
            repositories.push(repo);
        }
        Ok(Self { repositories })
    }

    /// Registry entries with label corrections applied.
    pub fn with_labels(&self, labels: &LabelOverrides) -> Vec<RepositoryRef> {
        self.repositories
            .iter()
            .map(|r| RepositoryRef {
                path: r.path.clone(),
                label: labels.apply(&r.label),
            })
            .collect()
    }
}

/// Source of raw `sha|author-date|subject` log lines
pub trait CommitLogSource: Send + Sync {
    fn log_lines(&self, repo: &Path, window: &DayWindow) -> Result<Vec<String>, DevlogError>;
}

/// `git log` over the day window, merges excluded
#[derive(Debug, Clone, Default)]
pub struct GitCommitLog;

impl CommitLogSource for GitCommitLog {
    fn log_lines(&self, repo: &Path, window: &DayWindow) -> Result<Vec<String>, DevlogError> {
        let args = vec![
            "-C".to_string(),
            repo.display().to_string(),
            "log".to_string(),
            "--no-merges".to_string(),
            format!("--since={}", window.since()),
            format!("--until={}", window.until()),
            "--format=%H|%ai|%s".to_string(),
        ];
        let output = Command::new("git")
            .args(&args)
            .output()
            .map_err(|e| DevlogError::GitCommand {
                command: format!("git {}", args.join(" ")),
                stderr: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(DevlogError::GitCommand {
                command: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }
}

/// Split one `sha|date|subject` line; the subject may itself contain `|`.
pub fn parse_log_line(line: &str) -> Option<(String, String, String)> {
    if line.trim().is_empty() {
        return None;
    }
    let mut parts = line.splitn(3, '|');
    let sha = parts.next()?.trim();
    let date = parts.next()?.trim();
    let message = parts.next()?.trim();
    if sha.is_empty() {
        return None;
    }
    Some((sha.to_string(), date.to_string(), message.to_string()))
}

fn timestamp_key(ts: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S %z").ok()
}

/// Collects a day's commits across repositories
pub struct ActivityAggregator<S: CommitLogSource> {
    source: S,
}

impl<S: CommitLogSource> ActivityAggregator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// All non-merge commits in the window, oldest first.
    pub fn collect(&self, window: &DayWindow, repos: &[RepositoryRef]) -> Vec<CommitEntry> {
        let mut commits = Vec::new();
        for repo in repos {
            if !repo.path.is_dir() {
                debug!(repo = %repo.path.display(), "Skipping missing repository");
                continue;
            }
            let lines = match self.source.log_lines(&repo.path, window) {
                Ok(lines) => lines,
                Err(e) => {
                    warn!(repo = %repo.path.display(), error = %e, "Skipping repository after log failure");
                    continue;
                }
            };
            for line in lines {
                if let Some((sha, timestamp, message)) = parse_log_line(&line) {
                    commits.push(CommitEntry {
                        sha,
                        timestamp,
                        message,
                        project: repo.label.clone(),
                        repo_path: repo.path.clone(),
                    });
                }
            }
        }

        commits.sort_by(|a, b| {
            match (timestamp_key(&a.timestamp), timestamp_key(&b.timestamp)) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => a.timestamp.cmp(&b.timestamp),
            }
        });
        info!(date = %window.date, commits = commits.len(), repos = repos.len(), "Aggregated commits");
        commits
    }

    /// Aggregate straight into an activity record.
    pub fn record_for(&self, window: &DayWindow, repos: &[RepositoryRef]) -> ActivityRecord {
        ActivityRecord::from_commits(window.date, self.collect(window, repos))
    }
}
