//! Document rendering and persistence.
//!
//! A document is `{date}-{slug}.{ext}` under the output directory: a `---`
//! delimited front-matter block (title, date, excerpt, tags, author), a blank
//! line, then the markdown body. Writes go through a temp file and a rename so
//! a reader never observes a half-written document.

use crate::activity::{parse_date, DATE_FORMAT};
use crate::decode::GenerationResult;
use crate::error::{DevlogError, StorageError};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const SLUG_MAX_LEN: usize = 80;
pub const FALLBACK_SLUG: &str = "untitled";

/// Filesystem- and URL-safe identifier derived from a title.
///
/// Lowercases, collapses every run of non `[a-z0-9]` characters into one
/// hyphen, trims hyphens at both ends, and truncates to 80 characters. Never
/// returns an empty string.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    // ASCII only, so byte truncation is safe
    slug.truncate(SLUG_MAX_LEN);
    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Escape a value for a double-quoted front-matter string.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Metadata header preceding a document body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter<'a> {
    pub title: &'a str,
    pub date: NaiveDate,
    pub excerpt: &'a str,
    pub tags: &'a [String],
    pub author: &'a str,
}

impl FrontMatter<'_> {
    pub fn render(&self) -> String {
        let tags = self
            .tags
            .iter()
            .map(|t| quote(t))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "---\ntitle: {}\ndate: {}\nexcerpt: {}\ntags: [{}]\nauthor: {}\n---\n",
            quote(self.title),
            quote(&self.date.format(DATE_FORMAT).to_string()),
            quote(self.excerpt),
            tags,
            quote(self.author),
        )
    }
}

/// Full document text: header, blank line, trimmed body, one trailing newline.
pub fn render_document(result: &GenerationResult, date: NaiveDate, author: &str) -> String {
    let header = FrontMatter {
        title: &result.title,
        date,
        excerpt: &result.excerpt,
        tags: &result.tags,
        author,
    }
    .render();
    format!("{}\n{}\n", header, result.content.trim())
}

/// Documents already present in the output directory, grouped by date
#[derive(Debug, Clone, Default)]
pub struct ExistingDocuments {
    by_date: BTreeMap<NaiveDate, Vec<PathBuf>>,
}

impl ExistingDocuments {
    /// Index `{YYYY-MM-DD}-*.{ext}` files in `dir`. A missing directory is empty.
    pub fn scan(dir: &Path, extension: &str) -> Result<Self, DevlogError> {
        let mut index = Self::default();
        if !dir.exists() {
            return Ok(index);
        }

        let pattern = format!(r"^(\d{{4}}-\d{{2}}-\d{{2}})-.*\.{}$", regex::escape(extension));
        let re = Regex::new(&pattern)
            .map_err(|e| DevlogError::ConfigError(format!("Invalid document extension: {}", e)))?;

        for entry in fs::read_dir(dir).map_err(StorageError::IoError)? {
            let entry = entry.map_err(StorageError::IoError)?;
            if !entry.file_type().map_err(StorageError::IoError)?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(caps) = re.captures(name) else {
                continue;
            };
            if let Ok(date) = parse_date(&caps[1]) {
                index.insert(date, entry.path());
            }
        }

        for paths in index.by_date.values_mut() {
            paths.sort();
        }
        debug!(dir = %dir.display(), dates = index.by_date.len(), "Indexed existing documents");
        Ok(index)
    }

    pub fn insert(&mut self, date: NaiveDate, path: PathBuf) {
        self.by_date.entry(date).or_default().push(path);
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.by_date.contains_key(date)
    }

    pub fn for_date(&self, date: &NaiveDate) -> &[PathBuf] {
        self.by_date.get(date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of dates with at least one document.
    pub fn date_count(&self) -> usize {
        self.by_date.len()
    }

    /// Total number of indexed documents.
    pub fn document_count(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }
}

/// Writes validated results into the output directory
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    dir: PathBuf,
    extension: String,
    author: String,
}

impl DocumentWriter {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
            author: author.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// `{dir}/{date}-{slug}.{ext}` for a title.
    pub fn path_for(&self, date: NaiveDate, title: &str) -> PathBuf {
        self.dir.join(format!(
            "{}-{}.{}",
            date.format(DATE_FORMAT),
            slugify(title),
            self.extension
        ))
    }

    /// Persist `result` for `date`, replacing `prior` documents for that date.
    ///
    /// The new file is staged in a temp file first; prior documents are then
    /// removed (a missing file is not an error) and the temp file is renamed
    /// into place.
    pub fn write(
        &self,
        date: NaiveDate,
        result: &GenerationResult,
        prior: &[PathBuf],
    ) -> Result<PathBuf, DevlogError> {
        // create_dir_all tolerates concurrent creation by sibling workers
        fs::create_dir_all(&self.dir).map_err(StorageError::IoError)?;

        let path = self.path_for(date, &result.title);
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;
        let temp_path = self.dir.join(format!(".{}.tmp", file_name));

        let text = render_document(result, date, &self.author);
        fs::write(&temp_path, text.as_bytes()).map_err(|e| StorageError::AtomicWrite {
            path: temp_path.clone(),
            message: e.to_string(),
        })?;

        for old in prior {
            if old == &path {
                continue;
            }
            remove_best_effort(old);
        }

        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StorageError::AtomicWrite {
                path: path.clone(),
                message: e.to_string(),
            }
        })?;

        debug!(path = %path.display(), "Wrote document");
        Ok(path)
    }
}

fn remove_best_effort(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed prior document"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove prior document"),
    }
}
