//! Static correction tables for project metadata.
//!
//! Both tables are built once from configuration and shared read-only for the
//! duration of a run; nothing mutates them after construction.

use std::collections::BTreeMap;

/// Authoritative technology-stack descriptions keyed by project label.
///
/// Entries are handed to the generator as non-negotiable fact for every
/// project present on a given day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackOverrides {
    entries: BTreeMap<String, String>,
}

impl StackOverrides {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Corrections for known historical naming drift.
    pub fn builtin() -> Self {
        Self::new(default_stack_overrides())
    }

    pub fn get(&self, project: &str) -> Option<&str> {
        self.entries.get(project).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(label, correction)` pairs for the given projects, in project order.
    pub fn applicable<'p, I>(&self, projects: I) -> Vec<(&str, &str)>
    where
        I: IntoIterator<Item = &'p str>,
    {
        projects
            .into_iter()
            .filter_map(|p| self.entries.get_key_value(p))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Renames applied to repository labels before aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelOverrides {
    entries: BTreeMap<String, String>,
}

impl LabelOverrides {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn builtin() -> Self {
        Self::new(default_label_overrides())
    }

    /// Corrected label, or the input unchanged when no rename exists.
    pub fn apply(&self, label: &str) -> String {
        self.entries
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }
}

pub fn default_stack_overrides() -> BTreeMap<String, String> {
    [
        (
            "AustinsElite (Legacy)",
            "Legacy PHP app (custom framework with some Laravel packages), not Next.js.",
        ),
        (
            "AustinsElite (Next.js)",
            "Primary AustinsElite production app on Laravel 12 (historical label is stale), not Next.js.",
        ),
        (
            "AustinsElite (Legacy PHP + some Laravel packages)",
            "Legacy PHP app with some Laravel packages; not Next.js.",
        ),
        (
            "AustinsElite (Laravel 12)",
            "Primary AustinsElite production app on Laravel 12 (historical \"Next.js\" label is stale).",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn default_label_overrides() -> BTreeMap<String, String> {
    [
        ("AustinsElite (Next.js)", "AustinsElite (Laravel 12)"),
        (
            "AustinsElite (Legacy)",
            "AustinsElite (Legacy PHP + some Laravel packages)",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
